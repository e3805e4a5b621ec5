//! # API Models
//!
//! Request and response bodies of the operator API. Database rows live in
//! `db::models`; these types carry the API's own formatting (camelCase
//! fields, upper-case enum names, display amounts).
//!
//! | File | Contents |
//! |------|----------|
//! | `requests.rs` | Bodies and query strings the API accepts |
//! | `responses.rs` | The `ApiResponse` envelope and its payloads |

pub mod requests;
pub mod responses;

pub use requests::*;
pub use responses::*;
