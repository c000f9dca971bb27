use thiserror::Error;

/// Central error type for the core library.
///
/// Rendering and page mutation degrade gracefully almost everywhere (missing
/// pages become "create" links, unknown tokens become HTML comments); the
/// variants below are the few cases that must surface to the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// A page rename (via the `name` header property) collides with an
    /// existing page. Silently renaming over it would corrupt the link graph,
    /// so this is a hard failure.
    #[error("a page named \"{0}\" already exists")]
    PageExists(String),

    /// The image collaborator does not know the requested key.
    #[error("unknown image key: {0}")]
    UnknownImage(String),

    /// The markdown engine rejected the body.
    #[error("markdown rendering failed: {0}")]
    Markdown(String),
}

pub type Result<T> = std::result::Result<T, Error>;
