mod traits;
mod retrieve;

pub use traits::*;
pub use retrieve::{KeywordRetriever, RetrieveTool, RetrievedDocument, Retriever};
