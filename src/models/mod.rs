pub mod game;
pub mod game_match;
pub mod schema;
pub mod team;
pub mod team_member;
pub mod tournament;
pub mod tournament_status;
pub mod tournament_type;
pub mod user;
