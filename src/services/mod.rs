//! External collaborators of the poll loop.
//!
//! Each collaborator sits behind a trait so the loop can be driven by fakes
//! in tests.

pub mod extractor;
pub mod fetcher;
pub mod notifier;
pub mod public_ip;

pub use extractor::{CareersPageExtractor, Extractor};
pub use fetcher::{Fetcher, HttpFetcher, RenderingFetcher};
pub use notifier::{LogNotifier, Notifier, SmtpNotifier};
pub use public_ip::{HttpIpResolver, IpResolver};
