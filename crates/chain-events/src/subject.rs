//! The bus subject grammar: `zkpay.<chain-alias>.<contract>.<event>`.

use std::fmt;

use crate::errors::EventDecodeError;

const ROOT: &str = "zkpay";
const SEGMENTS: usize = 4;

/// A fully concrete subject.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Subject {
    pub chain_alias: String,
    pub contract: String,
    pub event: String,
}

impl Subject {
    pub fn new(chain_alias: &str, contract: &str, event: &str) -> Self {
        Self {
            chain_alias: chain_alias.to_owned(),
            contract: contract.to_owned(),
            event: event.to_owned(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, EventDecodeError> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != SEGMENTS || parts[0] != ROOT || parts.iter().any(|p| p.is_empty()) {
            return Err(EventDecodeError::InvalidSubject(s.to_owned()));
        }
        Ok(Self::new(parts[1], parts[2], parts[3]))
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{ROOT}.{}.{}.{}", self.chain_alias, self.contract, self.event)
    }
}

/// A subscription pattern; `*` matches any single segment.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SubjectPattern {
    segments: [String; SEGMENTS],
}

impl SubjectPattern {
    /// All-chains pattern for one event type.
    pub fn for_event(contract: &str, event: &str) -> Self {
        Self {
            segments: [
                ROOT.to_owned(),
                "*".to_owned(),
                contract.to_owned(),
                event.to_owned(),
            ],
        }
    }

    pub fn parse(s: &str) -> Result<Self, EventDecodeError> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != SEGMENTS || parts.iter().any(|p| p.is_empty()) {
            return Err(EventDecodeError::InvalidSubject(s.to_owned()));
        }
        Ok(Self {
            segments: [
                parts[0].to_owned(),
                parts[1].to_owned(),
                parts[2].to_owned(),
                parts[3].to_owned(),
            ],
        })
    }

    pub fn matches(&self, subject: &Subject) -> bool {
        let concrete = [
            ROOT,
            subject.chain_alias.as_str(),
            subject.contract.as_str(),
            subject.event.as_str(),
        ];
        self.segments
            .iter()
            .zip(concrete)
            .all(|(pat, seg)| pat == "*" || pat == seg)
    }
}

impl fmt::Display for SubjectPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
