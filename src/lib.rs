//! SparkHub - Subscription State Reconciler
//!
//! This crate projects payment-provider webhook events onto local
//! subscription state for the SparkHub training platform, with idempotent
//! dunning escalation and a self-healing identity resolution chain.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
