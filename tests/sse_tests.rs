use bytes::Bytes;
use futures_util::{stream, StreamExt};
use pdf_quiz::core::RawByteStream;
use pdf_quiz::error::AIError;
use pdf_quiz::streaming::text_from_sse_bytes;

fn byte_stream(chunks: Vec<&'static str>) -> RawByteStream {
    Box::pin(stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c)))))
}

async fn drain(bytes: RawByteStream) -> (String, Option<AIError>) {
    let mut text = String::new();
    let mut s = text_from_sse_bytes(bytes);
    while let Some(item) = s.next().await {
        match item {
            Ok(delta) => text.push_str(&delta),
            Err(e) => return (text, Some(e)),
        }
    }
    (text, None)
}

const MESSAGE: &str = "event: message_start\n\
data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"role\":\"assistant\",\"content\":[]}}\n\n\
event: content_block_start\n\
data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n\
event: ping\n\
data: {\"type\":\"ping\"}\n\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"[{\\\"question\\\":\"}}\n\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" \\\"Q?\\\"\"}}\n\n\
event: content_block_stop\n\
data: {\"type\":\"content_block_stop\",\"index\":0}\n\n\
event: message_delta\n\
data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"}}\n\n\
event: message_stop\n\
data: {\"type\":\"message_stop\"}\n\n";

#[tokio::test]
async fn text_deltas_are_extracted() {
    let (text, err) = drain(byte_stream(vec![MESSAGE])).await;
    assert!(err.is_none());
    assert_eq!(text, "[{\"question\": \"Q?\"");
}

#[tokio::test]
async fn events_split_across_network_chunks() {
    let mut chunks = Vec::new();
    let mut rest = MESSAGE;
    while !rest.is_empty() {
        let mut cut = rest.len().min(13);
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        chunks.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    let (text, err) = drain(byte_stream(chunks)).await;
    assert!(err.is_none());
    assert_eq!(text, "[{\"question\": \"Q?\"");
}

#[tokio::test]
async fn error_event_terminates_the_stream() {
    let body = "event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"[\"}}\n\n\
event: error\n\
data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n\
event: content_block_delta\n\
data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"ignored\"}}\n\n";
    let (text, err) = drain(byte_stream(vec![body])).await;
    assert_eq!(text, "[");
    match err {
        Some(AIError::Stream(message)) => assert_eq!(message, "overloaded_error: Overloaded"),
        other => panic!("expected a stream error, got {other:?}"),
    }
}

#[tokio::test]
async fn transport_errors_surface_as_stream_errors() {
    let items: Vec<Result<Bytes, AIError>> = vec![
        Ok(Bytes::from("data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"[\"}}\n\n")),
        Err(AIError::Stream("socket closed".to_string())),
    ];
    let (text, err) = drain(Box::pin(stream::iter(items))).await;
    assert_eq!(text, "[");
    assert!(matches!(err, Some(AIError::Stream(_))));
}

#[tokio::test]
async fn unparseable_events_are_skipped() {
    let body = "data: not json\n\n\
data: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"ok\"}}\n\n";
    let (text, err) = drain(byte_stream(vec![body])).await;
    assert!(err.is_none());
    assert_eq!(text, "ok");
}
