//! # rusty-forms
//!
//! Declarative form models for server-side request handling: declare fields,
//! labels and validators once, then parse requests into model instances and
//! validate them synchronously or asynchronously.
//!
//! ## Quick Start
//!
//! ```rust
//! use rusty_forms::{define_model, validators, FormRequest, RequestBag};
//!
//! let login = define_model("loginForm")
//!     .fields(["email_address", "password"])
//!     .validators("email_address", [validators::required(), validators::email()])
//!     .validator("password", validators::required())
//!     .build()
//!     .unwrap();
//!
//! let body: RequestBag = [("loginForm_email_address", "not-an-email")].into_iter().collect();
//! let mut form = login.create();
//! form.parse_request_sync(FormRequest::new().with_body(body));
//!
//! assert!(!form.validate_sync().unwrap());
//! assert_eq!(
//!     form.get_first_error("email_address").unwrap(),
//!     "Email Address must be a valid email address."
//! );
//! assert_eq!(form.get_first_error("password").unwrap(), "Password is a required field.");
//! ```
//!
//! ## Architecture
//!
//! - **`schema`** - `define_model` builder and the shared [`FormSchema`]
//! - **`model`** - [`FormModel`] instances: attributes, request parsing, validation pipelines
//! - **`validator`** - the [`Validator`] contract; **`validators`** - the built-in catalog
//! - **`events`** - publish/subscribe hub with fire-and-forget and sequential dispatch
//! - **`store`** - attribute storage with change tracking
//! - **`config`** - `rusty-forms.toml` loading and upload field mappings
//! - **`sniff`** - content-based MIME detection for uploads

pub mod config;
pub mod error;
pub mod events;
pub mod inflect;
pub mod model;
pub mod request;
pub mod schema;
pub mod sniff;
pub mod store;
pub mod template;
pub mod validator;
pub mod validators;
pub mod value;

pub use config::{Config, FileField, FileFieldMappings, MappingPreset};
pub use error::{FormError, Result};
pub use events::{EventHub, Outcome};
pub use model::{lifecycle, Context, ErrorMap, EventArgs, FormModel};
pub use request::{FormRequest, RequestBag, RequestSource};
pub use schema::{define_model, FormSchema, SchemaBuilder};
pub use sniff::{ContentSniffer, SignatureSniffer};
pub use store::{Attributes, SetOptions};
pub use validator::{CallShape, Candidate, Validator, ValidatorKind, Verdict};
pub use value::Value;
