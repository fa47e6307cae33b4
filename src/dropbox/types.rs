use serde::{Deserialize, Serialize};

use crate::transport::Cursor;

/// Replace whatever is at the path; rename on a conflicting concurrent write.
const WRITE_MODE: &str = "overwrite";

#[derive(Debug, Serialize)]
pub struct CommitInfo<'a> {
    pub path: &'a str,
    pub mode: &'static str,
    pub autorename: bool,
}

impl<'a> CommitInfo<'a> {
    pub fn overwrite(path: &'a str) -> Self {
        Self {
            path,
            mode: WRITE_MODE,
            autorename: true,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionStartArg {
    pub close: bool,
}

#[derive(Debug, Deserialize)]
pub struct SessionStartResult {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct AppendArg<'a> {
    pub cursor: &'a Cursor,
    pub close: bool,
}

#[derive(Debug, Serialize)]
pub struct FinishArg<'a> {
    pub cursor: &'a Cursor,
    pub commit: CommitInfo<'a>,
}

#[derive(Debug, Deserialize)]
pub struct Account {
    pub name: AccountName,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccountName {
    pub display_name: String,
}
