mod common;
mod dlq;
mod trigger;
