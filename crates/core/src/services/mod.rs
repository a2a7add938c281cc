//! Business logic services.

#![allow(missing_docs)]

pub mod access;
pub mod attachments;
pub mod blocks;
pub mod chat;
pub mod events;
pub mod identity;
pub mod ticket;

pub use access::AccessGate;
pub use attachments::{AttachmentService, CleanupQueue, CleanupQueueService, NoOpCleanupQueue};
pub use blocks::{BlockChecker, BlockCheckerService, HttpBlockChecker};
pub use chat::ChatService;
pub use events::{
    ChannelName, EventPublisher, EventPublisherService, MessagePayload, NoOpEventPublisher,
    StreamEvent,
};
pub use identity::{HttpIdentityProvider, Identity, IdentityProvider, IdentityProviderService};
pub use ticket::TicketService;
