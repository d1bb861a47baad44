// Cross-context message contract for the extension scaffold.
// Requests are JSON envelopes tagged by `action`; every exchange
// produces exactly one Response.

mod actions;
mod envelope;

pub use actions::{
    BackgroundRequest, ExtensionInfo, ImageEntry, LinkEntry, ModifyData, PageData, PageInfo,
    PageRequest, SavedData, Settings, Viewport, MAX_IMAGES, MAX_LINKS, MAX_TEXT_BLOCKS,
};
pub use envelope::{action_of, decode, now_millis, DecodeError, Response, Routed};
