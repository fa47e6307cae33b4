use bytes::Bytes;
use reqwest::{header::*, Response};
use serde::Serialize;
use tracing::debug;

use crate::{
    dropbox::{types::*, HTTP},
    transport::{AppKey, Cursor, RefreshedToken},
    UploadError,
};

pub const API_URI: &str = "https://api.dropboxapi.com/2";
pub const CONTENT_URI: &str = "https://content.dropboxapi.com/2";
pub const TOKEN_URI: &str = "https://api.dropbox.com/oauth2/token";

const API_ARG: &str = "Dropbox-API-Arg";

pub async fn upload(token: &str, path: &str, body: Bytes) -> Result<(), UploadError> {
    content_call(token, "files/upload", &CommitInfo::overwrite(path), body).await?;
    Ok(())
}

pub async fn session_start(token: &str, body: Bytes) -> Result<String, UploadError> {
    let res = content_call(
        token,
        "files/upload_session/start",
        &SessionStartArg { close: false },
        body,
    )
    .await?
    .json::<SessionStartResult>()
    .await
    .map_err(|e| UploadError::Other(format!("unexpected session start response: {e}")))?;

    Ok(res.session_id)
}

pub async fn session_append(token: &str, cursor: &Cursor, body: Bytes) -> Result<(), UploadError> {
    let arg = AppendArg {
        cursor,
        close: false,
    };
    content_call(token, "files/upload_session/append_v2", &arg, body).await?;
    Ok(())
}

pub async fn session_finish(
    token: &str,
    cursor: &Cursor,
    path: &str,
    body: Bytes,
) -> Result<(), UploadError> {
    let arg = FinishArg {
        cursor,
        commit: CommitInfo::overwrite(path),
    };
    content_call(token, "files/upload_session/finish", &arg, body).await?;
    Ok(())
}

pub async fn current_account(token: &str) -> Result<String, UploadError> {
    let res = HTTP
        .post(format!("{API_URI}/users/get_current_account"))
        .bearer_auth(token)
        .header(CONTENT_TYPE, "application/json")
        .body("null")
        .send()
        .await
        .map_err(request_error)?;

    let account = check(res)
        .await?
        .json::<Account>()
        .await
        .map_err(|e| UploadError::Other(format!("unexpected account response: {e}")))?;

    debug!(email = ?account.email, "current account fetched");
    Ok(account.name.display_name)
}

pub async fn refresh_token(app: &AppKey, refresh_token: &str) -> Result<RefreshedToken, UploadError> {
    let res = HTTP
        .post(TOKEN_URI)
        .basic_auth(&app.key, Some(&app.secret))
        .form(&[
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await
        .map_err(|e| UploadError::AuthRefresh(format!("Could not send post request to '{TOKEN_URI}': {e}")))?;

    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        return Err(UploadError::AuthRefresh(format!(
            "Token refresh failed: {status} {text}"
        )));
    }

    res.json::<RefreshedToken>()
        .await
        .map_err(|e| UploadError::AuthRefresh(format!("unexpected token response: {e}")))
}

async fn content_call<A: Serialize>(
    token: &str,
    endpoint: &str,
    arg: &A,
    body: Bytes,
) -> Result<Response, UploadError> {
    let arg = header_safe_json(arg)?;
    let len = body.len();

    let res = HTTP
        .post(format!("{CONTENT_URI}/{endpoint}"))
        .bearer_auth(token)
        .header(API_ARG, arg)
        .header(CONTENT_TYPE, "application/octet-stream")
        .body(body)
        .send()
        .await
        .map_err(request_error)?;

    debug!(endpoint, len, status = %res.status(), "content request sent");
    check(res).await
}

async fn check(res: Response) -> Result<Response, UploadError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let text = res.text().await.unwrap_or_default();
    Err(UploadError::from_status(status.as_u16(), &text))
}

fn request_error(e: reqwest::Error) -> UploadError {
    match e.is_timeout() {
        true => UploadError::Timeout("request"),
        false => UploadError::Network(e.to_string()),
    }
}

/// JSON for the `Dropbox-API-Arg` header. Header values must be ASCII, so
/// everything else is escaped as `\uXXXX`.
pub fn header_safe_json<A: Serialize>(arg: &A) -> Result<String, UploadError> {
    let json = serde_json::to_string(arg)?;
    let mut out = String::with_capacity(json.len());

    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }

        let mut buf = [0u16; 2];
        for unit in c.encode_utf16(&mut buf) {
            out.push_str(&format!("\\u{unit:04x}"));
        }
    }

    Ok(out)
}
