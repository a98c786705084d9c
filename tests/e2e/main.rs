//! End-to-end scenarios for the vellum document service.
