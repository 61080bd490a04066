//! Retrieval-augmented Q&A over the Nostr NIP documents: scraping into a
//! dataset, optional adapter fine-tuning, and a hosted-model chat service.

pub mod chat;
pub mod core;
pub mod docs;
pub mod finetune;
pub mod llm;
pub mod qa;
pub mod rag;
pub mod server;
pub mod state;
