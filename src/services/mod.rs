pub mod accounts;
pub mod catalog;
pub mod interactions;
pub mod matching;
pub mod profile;
pub mod ranker;
pub mod similarity;
pub mod song_recommendations;

pub use accounts::AccountService;
pub use interactions::InteractionService;
pub use matching::MatchService;
pub use profile::ProfileService;
pub use ranker::CandidateRanker;
pub use similarity::SimilarityScorer;
pub use song_recommendations::{RecommendedSong, SongRecommender};
