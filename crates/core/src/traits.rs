use crate::{DirectoryError, ModelError};
use async_trait::async_trait;

/// Source of the raw provider directory document.
#[async_trait]
pub trait DirectorySource {
    async fn fetch(&self) -> Result<Vec<u8>, DirectoryError>;
}

#[async_trait]
impl<T> DirectorySource for Box<T>
where
    T: DirectorySource + Send + Sync + ?Sized,
{
    async fn fetch(&self) -> Result<Vec<u8>, DirectoryError> {
        (**self).fetch().await
    }
}

/// Text-in/text-out language model capability.
#[async_trait]
pub trait LanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}
