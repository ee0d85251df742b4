use std::path::PathBuf;

use argh::FromArgs;

#[derive(Debug, Clone, FromArgs)]
#[argh(description = "zkpay backend coordinator")]
pub struct Args {
    #[argh(option, short = 'c', description = "path to configuration")]
    pub config: PathBuf,

    #[argh(
        option,
        short = 'd',
        description = "datadir path that will contain the databases"
    )]
    pub datadir: Option<PathBuf>,
}
