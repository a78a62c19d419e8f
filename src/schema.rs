table! {
    byes (league_id, season_year, week_number, user_id) {
        league_id -> Int8,
        season_year -> Int4,
        week_number -> Int2,
        user_id -> Int8,
        created_at -> Nullable<Timestamptz>,
    }
}

table! {
    games (league_id, season_year, game_id) {
        league_id -> Int8,
        season_year -> Int4,
        game_id -> Varchar,
        week_number -> Int2,
        provider -> Varchar,
        home_abbr -> Varchar,
        away_abbr -> Varchar,
        kickoff_time -> Timestamptz,
        status -> Varchar,
        home_score -> Nullable<Int4>,
        away_score -> Nullable<Int4>,
        winner_abbr -> Nullable<Varchar>,
        updated_at -> Nullable<Timestamptz>,
    }
}

table! {
    leagues (id) {
        id -> Int8,
        name -> Varchar,
        owner_id -> Int8,
        season_year -> Int4,
        current_week -> Int2,
        timezone -> Varchar,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

table! {
    members (league_id, user_id) {
        league_id -> Int8,
        user_id -> Int8,
        display_name -> Varchar,
        created_at -> Nullable<Timestamptz>,
    }
}

table! {
    pick_results (league_id, season_year, week_number, user_id, slot) {
        league_id -> Int8,
        season_year -> Int4,
        week_number -> Int2,
        user_id -> Int8,
        slot -> Int2,
        team_abbr -> Varchar,
        result -> Varchar,
        graded_at -> Nullable<Timestamptz>,
    }
}

table! {
    picks (league_id, season_year, week_number, user_id, slot) {
        league_id -> Int8,
        season_year -> Int4,
        week_number -> Int2,
        user_id -> Int8,
        slot -> Int2,
        team_abbr -> Varchar,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

table! {
    users (id) {
        id -> Int8,
        username -> Varchar,
        password -> Varchar,
        is_admin -> Bool,
        created_at -> Nullable<Timestamptz>,
        updated_at -> Nullable<Timestamptz>,
    }
}

table! {
    week_configs (league_id, season_year, week_number) {
        league_id -> Int8,
        season_year -> Int4,
        week_number -> Int2,
        picks_required -> Int2,
        lock_time -> Timestamptz,
        reveal_time -> Timestamptz,
        updated_at -> Nullable<Timestamptz>,
    }
}

joinable!(leagues -> users (owner_id));
joinable!(members -> users (user_id));
joinable!(members -> leagues (league_id));

allow_tables_to_appear_in_same_query!(
    byes,
    games,
    leagues,
    members,
    pick_results,
    picks,
    users,
    week_configs,
);
