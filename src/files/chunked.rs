//! Chunked multipart upload
//!
//! Files are split into 5 MiB pieces. Every piece goes out as its own
//! `file_data` form field, in order, followed by one `metadata` field
//! carrying JSON that describes the whole upload. The balancer reassembles
//! the pieces by concatenating the `file_data` fields in arrival order.
//!
//! All pieces travel in a single request, so the client memory footprint is
//! roughly twice the file size while an upload is in flight.

use crate::api::client::BalancerClient;
use crate::api::diagnostics::OperationLog;
use crate::api::failure::ApiFailure;
use crate::api::transport::{ApiRequest, ApiResponse, FormPart};
use crate::config::Endpoints;
use crate::error::Result;
use crate::files::models::{ChunkedUploadMetadata, UploadMetadata};

pub const CHUNK_SIZE: usize = 5 * 1024 * 1024;

pub const FILE_DATA_FIELD: &str = "file_data";
pub const METADATA_FIELD: &str = "metadata";

/// Number of pieces a file of `total_size` bytes is split into
pub fn chunk_count(total_size: u64) -> usize {
    total_size.div_ceil(CHUNK_SIZE as u64) as usize
}

/// Split `data` into consecutive `CHUNK_SIZE` pieces; only the last may be shorter
pub fn split_into_chunks(data: &[u8]) -> Vec<&[u8]> {
    data.chunks(CHUNK_SIZE).collect()
}

/// Build the multipart request for a chunked upload.
///
/// Returns the request together with the metadata it carries.
pub fn build_chunked_upload(
    endpoints: &Endpoints,
    data: &[u8],
    metadata: UploadMetadata,
    temporary: bool,
) -> Result<(ApiRequest, ChunkedUploadMetadata)> {
    let chunks = split_into_chunks(data);

    let upload = ChunkedUploadMetadata {
        metadata,
        total_size: data.len() as u64,
        chunk_count: chunks.len(),
        is_temporary: temporary,
    };

    let mut parts: Vec<FormPart> = chunks
        .into_iter()
        .map(|chunk| FormPart::blob(FILE_DATA_FIELD, chunk.to_vec()))
        .collect();
    parts.push(FormPart::text(METADATA_FIELD, serde_json::to_string(&upload)?));

    let request = ApiRequest::multipart(endpoints.chunked_upload_url(temporary), parts);
    Ok((request, upload))
}

/// Send a chunked upload and hand back the raw response.
///
/// Interpreting the status and body is left to the caller.
pub async fn upload_file_chunked(
    client: &BalancerClient,
    log: &OperationLog<'_>,
    data: &[u8],
    metadata: UploadMetadata,
    temporary: bool,
) -> std::result::Result<(ApiResponse, ChunkedUploadMetadata), ApiFailure> {
    let (request, upload) = build_chunked_upload(client.endpoints(), data, metadata, temporary)
        .map_err(|e| ApiFailure::unknown(e.to_string()))?;

    log.info(format!(
        "Uploading {} bytes in {} chunk(s)",
        upload.total_size, upload.chunk_count
    ));

    let response = client.send_raw(log, request).await?;
    Ok((response, upload))
}
