pub mod identity;
pub mod request_id;

pub use identity::{Identity, VisitorId, USER_HEADER, VISITOR_HEADER};
pub use request_id::{make_span_with_request_id, request_id_middleware, RequestId};
