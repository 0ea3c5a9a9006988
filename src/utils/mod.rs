pub mod time;

use nanoid::nanoid;

/// Generate a 21-char url-safe identifier for runs, steps and event rows.
pub fn longid() -> String {
    nanoid!(21)
}
