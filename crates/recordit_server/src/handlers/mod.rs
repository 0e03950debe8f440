pub mod admin;
pub mod auth;
pub mod front;
pub mod user;

use axum::{
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use recordit_core::service::Download;

/// Serve a file as an attachment.
pub(crate) fn download_response(download: Download) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.filename.replace('"', "")
    );
    let mut response = download.bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(download.content_type),
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downloads_are_attachments() {
        let response = download_response(Download::zip("user logs.zip", vec![1, 2]));
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"user logs.zip\""
        );
    }
}
