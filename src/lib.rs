mod api;
mod app;
mod blocks;
mod components;
mod config;
mod drafts;
mod editor;
mod favorites;
mod images;
mod logging;
mod models;
mod pages;
mod placeholders;
mod session;
mod state;
mod storage;
mod util;

use crate::app::App;
use leptos::prelude::*;

// Needed for `#[wasm_bindgen(start)]` on the wasm entrypoint.
#[cfg(all(target_arch = "wasm32", not(test)))]
use wasm_bindgen::prelude::wasm_bindgen;

// Only register the WASM start function for normal builds (not for tests),
// otherwise wasm-bindgen-test will end up with multiple entry symbols.
#[cfg_attr(all(target_arch = "wasm32", not(test)), wasm_bindgen(start))]
pub fn main() {
    console_error_panic_hook::set_once();
    logging::init();
    mount_to_body(App);
}

// WASM-only tests (run with `cargo test --target wasm32-unknown-unknown` + wasm-bindgen-test-runner)
#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use crate::models::{Role, User};
    use crate::session::Session;
    use crate::storage::{load_json, load_string, remove, save_json, save_string, TOKEN_KEY, USER_KEY};
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_token_storage_roundtrip() {
        remove(TOKEN_KEY);
        assert_eq!(load_string(TOKEN_KEY), None);

        save_string(TOKEN_KEY, "t1");
        assert_eq!(load_string(TOKEN_KEY).as_deref(), Some("t1"));

        remove(TOKEN_KEY);
        assert_eq!(load_string(TOKEN_KEY), None);
    }

    #[wasm_bindgen_test]
    fn test_session_restores_persisted_user() {
        let user = User {
            id: 1,
            username: "ana".to_string(),
            email: String::new(),
            role: Role::Manager,
            is_admin: false,
        };
        save_string(TOKEN_KEY, "t2");
        save_json(USER_KEY, &user);

        let s = Session::restore();
        assert_eq!(s.token.as_deref(), Some("t2"));
        assert!(s.can_edit_documents());

        let mut s = s;
        s.clear();
        assert_eq!(load_string(TOKEN_KEY), None);
        assert_eq!(load_json::<User>(USER_KEY), None);
    }
}
