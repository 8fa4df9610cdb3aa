// Newline-delimited JSON streaming responses
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

/// Stream every message from `rx` to the client as one JSON line,
/// flushed as it arrives, until the sender side closes or the client
/// disconnects.
pub fn stream_from_receiver<T>(mut rx: tokio::sync::mpsc::Receiver<T>) -> impl IntoResponse
where
    T: Serialize + Send + 'static,
{
    let stream = async_stream::stream! {
        while let Some(msg) = rx.recv().await {
            yield encode_line(&msg);
        }
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(Body::from_stream(stream));

    match response {
        Ok(response) => response,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn encode_line<T: Serialize>(msg: &T) -> Result<Bytes, std::io::Error> {
    let encoded = serde_json::to_vec(msg)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let mut line = BytesMut::with_capacity(encoded.len() + 1);
    line.put_slice(&encoded);
    line.put_u8(b'\n');
    Ok(line.freeze())
}
