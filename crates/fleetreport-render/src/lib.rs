//! # fleetreport-render
//!
//! Spreadsheet serialization for fleetreport sheets.
//!
//! The engine lays a report out as a [`fleetreport_core::SheetGrid`];
//! this crate turns that grid into file bytes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use fleetreport_core::SheetWriter;
//! use fleetreport_render::XlsxSheetWriter;
//!
//! let writer = XlsxSheetWriter::new();
//! let xlsx_bytes = writer.write(&grid)?;
//! std::fs::write("performance_report.xlsx", xlsx_bytes)?;
//! ```

pub mod xlsx;

pub use xlsx::{XlsxSheetWriter, XLSX_CONTENT_TYPE};
