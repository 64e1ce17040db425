//! Bidirectional mapping between the layer model and the CAML XML dialect.

pub mod decode;
pub mod element;
pub mod encode;

pub use decode::{decode_document, decode_layer};
pub use element::{XmlElement, parse_document};
pub use encode::{encode_document, escape_xml, format_number};
