pub mod extraction;
pub mod llm;
pub mod processor;
pub mod rag;
pub mod safety;
pub mod storage;
pub mod structuring;
