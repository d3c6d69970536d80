//! Core naming primitives
//!
//! Building blocks shared by the transient tree and the storage layer:
//! - QName: expanded names, namespace constants, prefix splitting via memchr
//! - Symbols: hash-indexed interning of qualified names
//! - DocType: document type declarations

pub mod doctype;
pub mod qname;
pub mod symbols;

pub use doctype::DocumentType;
pub use qname::{ns, split_qname, QName};
pub use symbols::{SymbolId, SymbolTable};
