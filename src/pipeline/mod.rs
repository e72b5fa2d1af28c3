//! Pipeline stages for PDF table extraction.
//!
//! Each submodule implements one transformation step, so each can be
//! tested on its own and the partitioning backends can change without
//! touching the text and table stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ partition ──▶ clean ──▶ caption ──▶ chunk ──▶ records ──▶ html
//! (URL/path) (elements)   (text)    (VLM)      (title)   (title/body) (tables)
//! ```
//!
//! 1. [`input`]     canonicalise the user-supplied path or URL to a local file
//! 2. [`partition`] pick a strategy and produce elements:
//!    - [`render`] + [`layout`] read the text layer (`Fast`);
//!    - [`render`] + [`hires`] send page renders to the vision model (`HiRes`)
//! 3. [`clean`]     regroup broken paragraphs and normalise whitespace
//! 4. [`caption`]   describe large figures through [`llm`], with images
//!    prepared by [`encode`] and replies tidied by [`postprocess`]
//! 5. [`chunk`]     group elements by section title
//! 6. [`records`]   fold table HTML into text and split off titles
//! 7. [`html`]      parse table markup into `DataTable`s

pub mod caption;
pub mod chunk;
pub mod clean;
pub mod encode;
pub mod hires;
pub mod html;
pub mod input;
pub mod layout;
pub mod llm;
pub mod partition;
pub mod postprocess;
pub mod records;
pub mod render;
