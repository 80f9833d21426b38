use http::header::HeaderName;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

// Headers used by the storage services.
pub const X_MS_DATE: HeaderName = HeaderName::from_static("x-ms-date");
pub const X_MS_VERSION: HeaderName = HeaderName::from_static("x-ms-version");
pub const X_MS_BLOB_TYPE: HeaderName = HeaderName::from_static("x-ms-blob-type");
pub const X_MS_ERROR_CODE: HeaderName = HeaderName::from_static("x-ms-error-code");
pub const X_MS_CONTINUATION_NEXT_TABLE_NAME: HeaderName =
    HeaderName::from_static("x-ms-continuation-nexttablename");
pub const X_MS_CONTINUATION_NEXT_PARTITION_KEY: HeaderName =
    HeaderName::from_static("x-ms-continuation-nextpartitionkey");
pub const X_MS_CONTINUATION_NEXT_ROW_KEY: HeaderName =
    HeaderName::from_static("x-ms-continuation-nextrowkey");
pub const CONTENT_MD5: HeaderName = HeaderName::from_static("content-md5");

/// Service version every request is pinned to.
pub const SERVICE_VERSION: &str = "2021-08-06";

/// Default endpoint suffix for accounts without a custom endpoint.
pub const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

// Provider-side page bounds. Larger requests are clamped, not rejected.
pub const MAX_LIST_RESULTS: u32 = 5000;
pub const MAX_MESSAGE_COUNT: u32 = 32;
pub const MAX_ENTITY_TOP: u32 = 1000;

/// AsciiSet used to percent encode query values.
///
/// Derived from the provider's accepted query characters: everything except
/// unreserved characters and `/` is encoded.
pub static QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// AsciiSet used to percent encode path segments.
///
/// Same as the query set, but the sub-delimiters that OData key addressing
/// relies on stay readable.
pub static PATH_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b',')
    .remove(b'=');
