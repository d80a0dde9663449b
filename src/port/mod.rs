//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams between the application services and the outside
//! world: persistence, the hosted chat model and API key encryption.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!     HTTP / CLI ───▶│      Application        │
//!                    │   Domain + Services     │
//!                    └───────────┬─────────────┘
//!                                │
//!          ┌─────────────────────┼─────────────────────┐
//!          ▼                     ▼                     ▼
//!    ┌───────────┐        ┌─────────────┐       ┌─────────────┐
//!    │  SQLite   │        │ Chat model  │       │   Cipher    │
//!    │  adapter  │        │  (OpenAI)   │       │  (AES-GCM)  │
//!    └───────────┘        └─────────────┘       └─────────────┘
//! ```

pub mod outbound;
