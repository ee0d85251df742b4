//! Machinery for shipping blocking database calls onto the worker pool and
//! exposing `_async`/`_blocking` pairs for each repository operation.

use threadpool::ThreadPool;
use tokio::sync::oneshot;
use zkpay_db::{DbError, DbResult};

/// Runs a blocking repository call on the pool, returning its result over a
/// oneshot channel.  A dropped sender means the worker panicked; that is
/// surfaced as a database error rather than a poisoned task.
pub(crate) async fn run_blocking<R, F>(pool: &ThreadPool, f: F) -> DbResult<R>
where
    F: FnOnce() -> DbResult<R> + Send + 'static,
    R: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    pool.execute(move || {
        let _ = tx.send(f());
    });
    rx.await
        .map_err(|_| DbError::Other("storage worker dropped result".to_owned()))?
}

/// Declares an ops type over one repository trait.
///
/// Each listed operation becomes a `<name>_blocking` and a `<name>_async`
/// method; arguments are taken owned so the async variant can move them onto
/// the pool.  The body closure receives the shared trait handle.
macro_rules! inst_ops {
    {
        ($ops:ident => $tr:path) {
            $( fn $name:ident($($arg:ident: $ty:ty),* $(,)?) -> $ret:ty { $body:expr } )*
        }
    } => {
        pub struct $ops {
            pool: ::threadpool::ThreadPool,
            db: ::std::sync::Arc<dyn $tr + Send + Sync + 'static>,
        }

        impl $ops {
            pub fn new(
                pool: ::threadpool::ThreadPool,
                db: ::std::sync::Arc<dyn $tr + Send + Sync + 'static>,
            ) -> Self {
                Self { pool, db }
            }

            $( ::paste::paste! {
                pub fn [<$name _blocking>](&self, $($arg: $ty),*) -> ::zkpay_db::DbResult<$ret> {
                    let db = self.db.clone();
                    let body = $body;
                    body(db)
                }

                pub async fn [<$name _async>](&self, $($arg: $ty),*) -> ::zkpay_db::DbResult<$ret> {
                    let db = self.db.clone();
                    let body = $body;
                    $crate::exec::run_blocking(&self.pool, move || body(db)).await
                }
            } )*
        }
    };
}

pub(crate) use inst_ops;
