//! Facility map grid editor.
//!
//! This crate is compiled to WebAssembly and runs in the browser next to the
//! dashboard page. It owns the whole lifecycle of the facility map: translating
//! raw DOM input into map mutations, keeping the viewport (pan and discrete
//! zoom), hit-testing placed items, snapping previews to the grid and painting
//! the scene. The host page only wires DOM events to the engine, shows the
//! modals the engine asks for, and lets [`session::MapSession`] persist the
//! resulting [`engine::Action`]s through the REST backend.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level engine and the testable [`engine::EngineCore`] state machine |
//! | [`doc`] | Placed map items, tool catalog and the item store |
//! | [`camera`] | Viewport: pan clamp, zoom levels, coordinate conversions |
//! | [`grid`] | Grid line layout for the full logical extent |
//! | [`input`] | Modes, pointer kinds, keys and the gesture state |
//! | [`placement`] | Size classes, snapping, previews, tool labels and feed variants |
//! | [`scene`] | Scene-graph seam and the retained in-memory scene |
//! | [`style`] | Tool and drawing palettes, selection visuals |
//! | [`render`] | Paints the grid and scene to a 2D canvas context |
//! | [`wire`] | JSON payloads exchanged with the backend |
//! | [`gateway`] | REST client for the map endpoints |
//! | [`session`] | Host loop tying the engine to the gateway |
//! | [`config`] | Grid and gesture configuration |
//! | [`consts`] | Shared numeric defaults |

pub mod camera;
pub mod config;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod gateway;
pub mod grid;
pub mod input;
pub mod placement;
pub mod render;
pub mod scene;
pub mod session;
pub mod style;
pub mod wire;
