pub mod leaderboard;
pub mod maintenance;
pub mod vote;
