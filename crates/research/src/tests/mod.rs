//! Pipeline tests against scripted generation and index fakes.

mod retrieval_fanout;
