//! Wire types for the Figma REST endpoints used by `figport`.
//!
//! These mirror the JSON payloads one-to-one. Style properties of nodes
//! (paints, typography, layout grids, …) are kept as an opaque JSON map;
//! consumers that need them decode the fields they care about themselves.

mod comments;
mod file;
mod images;
mod projects;

pub use comments::{ClientMeta, Comment, CommentsResponse, NewComment, User, Vector};
pub use file::{File, Node, NodeType, UnknownNodeType};
pub use images::ImagesResponse;
pub use projects::{TeamProject, TeamProjectsResponse, Version, VersionsResponse};
