pub mod venture_scorer;

pub use venture_scorer::VentureScorer;
