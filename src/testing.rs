//! In-memory transport and clock for tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
        Mutex,
    },
};

use bytes::Bytes;
use futures::{future::BoxFuture, FutureExt};

use crate::{
    auth::Clock,
    transport::{AppKey, Cursor, RefreshedToken, Transport},
    UploadError,
};

pub const TOKEN_LIFETIME: u64 = 14_400;

pub fn app_key() -> AppKey {
    AppKey {
        key: "app".into(),
        secret: "secret".into(),
    }
}

pub struct FakeClock(AtomicU64);

impl FakeClock {
    pub fn new(now: u64) -> Self {
        Self(AtomicU64::new(now))
    }

    pub fn set(&self, now: u64) {
        self.0.store(now, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Upload { path: String, len: usize },
    Start { len: usize },
    Append { offset: u64, len: usize },
    Finish { offset: u64, path: String, len: usize },
    Account,
}

/// Records every data operation, stores committed files and fails on
/// demand.
#[derive(Default)]
pub struct FakeTransport {
    ops: Mutex<Vec<(Op, String)>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    sessions: Mutex<HashMap<String, Vec<u8>>>,
    failures: Mutex<HashMap<usize, UploadError>>,
    always: Mutex<Option<fn() -> UploadError>>,
    accepted_token: Mutex<Option<String>>,
    stall: AtomicBool,
    refreshes: AtomicU32,
    refresh_fails: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The data operation with this 0-based index fails with `err`.
    pub fn fail_op(&self, index: usize, err: UploadError) {
        self.failures.lock().unwrap().insert(index, err);
    }

    pub fn fail_always(&self, f: fn() -> UploadError) {
        *self.always.lock().unwrap() = Some(f);
    }

    /// Data operations with any other token fail with 401.
    pub fn accept_only(&self, token: &str) {
        *self.accepted_token.lock().unwrap() = Some(token.to_string());
    }

    pub fn stall(&self, stall: bool) {
        self.stall.store(stall, Ordering::SeqCst);
    }

    pub fn fail_refresh(&self, fail: bool) {
        self.refresh_fails.store(fail, Ordering::SeqCst);
    }

    pub fn refresh_count(&self) -> u32 {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().unwrap().iter().map(|(o, _)| o.clone()).collect()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.ops.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    fn check(&self, op: Op, token: &str) -> Result<(), UploadError> {
        let index = {
            let mut ops = self.ops.lock().unwrap();
            ops.push((op, token.to_string()));
            ops.len() - 1
        };

        if let Some(e) = self.failures.lock().unwrap().remove(&index) {
            return Err(e);
        }
        if let Some(f) = *self.always.lock().unwrap() {
            return Err(f());
        }
        match self.accepted_token.lock().unwrap().as_deref() {
            Some(t) if t != token => Err(UploadError::Authentication),
            _ => Ok(()),
        }
    }

    fn respond<T: Send + 'static>(
        &self,
        r: Result<T, UploadError>,
    ) -> BoxFuture<'_, Result<T, UploadError>> {
        if self.stall.load(Ordering::SeqCst) {
            return futures::future::pending().boxed();
        }
        futures::future::ready(r).boxed()
    }
}

impl Transport for FakeTransport {
    fn upload(
        &self,
        token: String,
        path: String,
        body: Bytes,
    ) -> BoxFuture<'_, Result<(), UploadError>> {
        let op = Op::Upload {
            path: path.clone(),
            len: body.len(),
        };
        let r = self.check(op, &token).map(|_| {
            self.files.lock().unwrap().insert(path, body.to_vec());
        });
        self.respond(r)
    }

    fn session_start(
        &self,
        token: String,
        body: Bytes,
    ) -> BoxFuture<'_, Result<String, UploadError>> {
        let r = self.check(Op::Start { len: body.len() }, &token).map(|_| {
            let mut sessions = self.sessions.lock().unwrap();
            let id = format!("session-{}", sessions.len() + 1);
            sessions.insert(id.clone(), body.to_vec());
            id
        });
        self.respond(r)
    }

    fn session_append(
        &self,
        token: String,
        cursor: Cursor,
        body: Bytes,
    ) -> BoxFuture<'_, Result<(), UploadError>> {
        let op = Op::Append {
            offset: cursor.offset,
            len: body.len(),
        };
        let r = self.check(op, &token).and_then(|_| {
            let mut sessions = self.sessions.lock().unwrap();
            let data = sessions
                .get_mut(&cursor.session_id)
                .ok_or_else(|| UploadError::Other("unknown session".into()))?;
            if data.len() as u64 != cursor.offset {
                return Err(UploadError::Other("incorrect offset".into()));
            }
            data.extend_from_slice(&body);
            Ok(())
        });
        self.respond(r)
    }

    fn session_finish(
        &self,
        token: String,
        cursor: Cursor,
        path: String,
        body: Bytes,
    ) -> BoxFuture<'_, Result<(), UploadError>> {
        let op = Op::Finish {
            offset: cursor.offset,
            path: path.clone(),
            len: body.len(),
        };
        let r = self.check(op, &token).and_then(|_| {
            let mut data = self
                .sessions
                .lock()
                .unwrap()
                .remove(&cursor.session_id)
                .ok_or_else(|| UploadError::Other("unknown session".into()))?;
            if data.len() as u64 != cursor.offset {
                return Err(UploadError::Other("incorrect offset".into()));
            }
            data.extend_from_slice(&body);
            self.files.lock().unwrap().insert(path, data);
            Ok(())
        });
        self.respond(r)
    }

    fn refresh_token(
        &self,
        _app: AppKey,
        _refresh_token: String,
    ) -> BoxFuture<'_, Result<RefreshedToken, UploadError>> {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;

        let r = match self.refresh_fails.load(Ordering::SeqCst) {
            true => Err(UploadError::Other("Token refresh failed: 400 Bad Request".into())),
            false => Ok(RefreshedToken {
                access_token: format!("token-{n}"),
                expires_in: TOKEN_LIFETIME,
            }),
        };
        futures::future::ready(r).boxed()
    }

    fn current_account(&self, token: String) -> BoxFuture<'_, Result<String, UploadError>> {
        let r = self
            .check(Op::Account, &token)
            .map(|_| "Test Account".to_string());
        self.respond(r)
    }
}
