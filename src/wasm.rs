//! WebAssembly bindings for the tamis index.
//!
//! The browser deployment streams a prebuilt index into the module, decodes
//! it once, and then answers queries for the lifetime of the page:
//!
//! 1. fetch the `.tamis` file, feeding each network chunk to
//!    [`TamisModule::push_index_chunk`] (chunks of up to [`CHUNK_WINDOW`]
//!    bytes keep copies across the boundary cheap),
//! 2. call [`TamisModule::init`] exactly once,
//! 3. call [`TamisModule::search`] as often as the user types.
//!
//! There is no error channel back to the host, so this is the one place in
//! the crate where errors become log messages: a failed `init` reports
//! through the imported `log` callback and leaves the module uninitialized
//! rather than half-built. Everything runs on the single cooperative thread
//! the host provides.

use wasm_bindgen::prelude::*;

use crate::index::{IndexOptions, QueryOptions, TextIndex};

/// Recommended upper bound for one `push_index_chunk` call, in bytes.
pub const CHUNK_WINDOW: usize = 16384;

#[wasm_bindgen]
extern "C" {
    /// Host-provided diagnostic sink for UTF-8 text.
    #[wasm_bindgen(js_namespace = tamis_host, js_name = log)]
    fn host_log(message: &str);
}

/// The module-side handle holding the streamed bytes and, after `init`, the
/// decoded index.
#[wasm_bindgen]
pub struct TamisModule {
    buffer: Vec<u8>,
    index: Option<TextIndex>,
}

#[wasm_bindgen]
impl TamisModule {
    /// An empty module: no bytes received, not initialized.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            index: None,
        }
    }

    /// Append one chunk of the serialized index to the receive buffer.
    pub fn push_index_chunk(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Decode the accumulated buffer into the process-wide index.
    ///
    /// On failure the module logs the reason and stays uninitialized; the
    /// receive buffer is dropped either way.
    pub fn init(&mut self) {
        if self.index.is_some() {
            host_log("tamis: init() called twice, ignoring");
            return;
        }

        let bytes = std::mem::take(&mut self.buffer);
        match TextIndex::loads(&bytes, &IndexOptions::default()) {
            Ok(index) => {
                host_log(&format!(
                    "tamis: index ready, {} documents, {} bytes resident",
                    index.len(),
                    index.size_in_bytes()
                ));
                self.index = Some(index);
            }
            Err(err) => {
                host_log(&format!("tamis: init failed: {err}"));
            }
        }
    }

    /// True once `init` has decoded an index.
    pub fn is_initialized(&self) -> bool {
        self.index.is_some()
    }

    /// Run a disjunctive query and emit every matching document text through
    /// the host log callback.
    pub fn search(&self, query: &str) {
        let Some(index) = &self.index else {
            host_log("tamis: search() before init(), ignoring");
            return;
        };

        let mut results = Vec::new();
        match index.query(query, &mut results, QueryOptions::default()) {
            Ok(count) => {
                host_log(&format!("tamis: {count} result(s) for {query:?}"));
                for text in &results {
                    host_log(text);
                }
            }
            Err(err) => host_log(&format!("tamis: search failed: {err}")),
        }
    }
}

impl Default for TamisModule {
    fn default() -> Self {
        Self::new()
    }
}
