// Candidate-job fit computation.
// Embedding and extraction calls go through ai_client, memoized in the result cache.

pub mod fit_scoring;
pub mod handlers;
pub mod models;
pub mod similarity;
pub mod skills;
