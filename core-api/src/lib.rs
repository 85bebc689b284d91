//! # Portal API Clients
//!
//! Typed clients for the portal's feature endpoints, layered on the
//! authenticated [`ApiClient`](core_session::ApiClient) from `core-session`.
//! Authentication, session renewal, and the retry-once policy are handled
//! underneath; these clients only know about paths and payload shapes.
//!
//! ## Modules
//!
//! - [`announcements`] - School announcements (public read, admin write)
//! - [`payment`] - Payment provider onboarding, methods, and history
//! - [`subscription`] - Subscription status and lifecycle
//!
//! ## Usage
//!
//! ```ignore
//! use core_api::announcements::AnnouncementsClient;
//!
//! let client = AnnouncementsClient::new(manager.api_client().clone());
//! let page = client.list(Some(5)).await?;
//! for item in page.announcements {
//!     println!("{}: {}", item.created_at, item.title);
//! }
//! ```

pub mod announcements;
pub mod payment;
pub mod subscription;

pub use announcements::AnnouncementsClient;
pub use payment::PaymentClient;
pub use subscription::SubscriptionClient;
