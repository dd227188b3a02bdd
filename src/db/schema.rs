diesel::table! {
    game_results (id) {
        id -> Integer,
        user_id -> Integer,
        difficulty -> Integer,
        level -> Integer,
        wpm -> Double,
        accuracy -> Double,
        errors -> Integer,
        score -> Integer,
        time_played -> Integer,
        played_at -> Timestamp,
    }
}

diesel::table! {
    performances (id) {
        id -> Integer,
        user_id -> Integer,
        wpm -> Double,
        accuracy -> Double,
        difficulty -> Integer,
        errors -> Nullable<Integer>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    phrases (id) {
        id -> Integer,
        text -> Text,
        difficulty -> Integer,
        created_by -> Nullable<Integer>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        username -> Text,
        role -> Text,
        token -> Text,
    }
}

diesel::joinable!(game_results -> users (user_id));
diesel::joinable!(performances -> users (user_id));
diesel::joinable!(phrases -> users (created_by));

diesel::allow_tables_to_appear_in_same_query!(
    game_results,
    performances,
    phrases,
    users,
);
