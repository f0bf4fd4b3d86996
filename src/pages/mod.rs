mod favorites;
mod reports;
mod templates;

pub use favorites::FavoritesPage;
pub use reports::{ReportEditorPage, ReportsPage};
pub use templates::{TemplateEditorPage, TemplatesPage};

use crate::components::ui::{
    Alert, AlertDescription, Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription,
    CardHeader, CardTitle, Input, Label, Spinner,
};
use crate::drafts::DraftError;
use crate::session::{self, SessionError};
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::{use_location, use_navigate};
use std::str::FromStr;

#[component]
pub fn LoginPage() -> impl IntoView {
    let username: RwSignal<String> = RwSignal::new(String::new());
    let password: RwSignal<String> = RwSignal::new(String::new());
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let loading: RwSignal<bool> = RwSignal::new(false);

    let app_state = expect_context::<AppContext>();

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        if loading.get_untracked() {
            return;
        }

        let username_val = username.get_untracked();
        let password_val = password.get_untracked();
        let api_client = app_state.0.api_client.get_untracked();

        loading.set(true);
        error.set(None);

        spawn_local(async move {
            match session::login(&api_client, &username_val, &password_val).await {
                Ok(s) => {
                    app_state.0.sign_in(s);
                    let _ = window().location().set_href("/reports");
                }
                Err(e @ (SessionError::MissingCredentials | SessionError::Rejected)) => {
                    let _ = error.try_set(Some(e.to_string()));
                }
                Err(SessionError::Api(e)) => {
                    log::warn!("login failed: {e}");
                    let _ = error.try_set(Some(e.to_string()));
                }
            }
            let _ = loading.try_set(false);
        });
    };

    view! {
        <div class="min-h-screen bg-background">
            <div class="mx-auto flex min-h-screen w-full max-w-sm flex-col justify-center px-4 py-10">
                <div class="mb-6 flex items-center justify-center">
                    <a href="/" class="text-sm font-medium text-foreground">"ReportDeck"</a>
                </div>

                <Card>
                    <CardHeader>
                        <CardTitle class="text-lg">"Log in"</CardTitle>
                        <CardDescription class="text-xs">"Use your username and password to continue."</CardDescription>
                    </CardHeader>

                    <CardContent>
                        <form class="flex flex-col gap-3" on:submit=on_submit>
                            <div class="flex flex-col gap-1.5">
                                <Label html_for="username" class="text-xs">"Username"</Label>
                                <Input
                                    id="username"
                                    placeholder="username"
                                    bind_value=username
                                    required=true
                                    class="h-8 text-sm"
                                />
                            </div>

                            <div class="flex flex-col gap-1.5">
                                <Label html_for="password" class="text-xs">"Password"</Label>
                                <Input
                                    id="password"
                                    r#type="password"
                                    placeholder="••••••••"
                                    bind_value=password
                                    required=true
                                    class="h-8 text-sm"
                                />
                            </div>

                            {move || error.get().map(|e| view! {
                                <Alert class="border-destructive/30">
                                    <AlertDescription class="text-destructive text-xs">{e}</AlertDescription>
                                </Alert>
                            })}

                            <Button
                                class="w-full"
                                size=ButtonSize::Sm
                                attr:disabled=move || loading.get()
                            >
                                <span class="inline-flex items-center gap-2">
                                    <Show when=move || loading.get() fallback=|| ().into_view()>
                                        <Spinner />
                                    </Show>
                                    {move || if loading.get() { "Signing in..." } else { "Continue" }}
                                </span>
                            </Button>
                        </form>
                    </CardContent>
                </Card>
            </div>
        </div>
    }
}

const NAV_ITEMS: [(&str, &str); 3] = [
    ("/reports", "Reports"),
    ("/templates", "Templates"),
    ("/favorites", "Favorite blocks"),
];

#[component]
pub fn AppLayout(children: ChildrenFn) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let pathname = use_location().pathname;
    let navigate = StoredValue::new(use_navigate());

    let logging_out: RwSignal<bool> = RwSignal::new(false);

    // Pick up role changes made by an admin since the last login.
    Effect::new(move |_| {
        let mut s = app_state.0.session.get_untracked();
        if !s.is_authenticated() {
            return;
        }
        let client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            match session::refresh_user(&client, &mut s).await {
                Ok(()) => {
                    let _ = app_state.0.session.try_set(s);
                }
                Err(SessionError::Api(e)) => {
                    let _ = app_state.0.handle_error(&e);
                }
                Err(e) => log::warn!("user refresh failed: {e}"),
            }
        });
    });

    let on_logout = move |_| {
        if logging_out.get_untracked() {
            return;
        }
        logging_out.set(true);
        let client = app_state.0.api_client.get_untracked();
        let mut s = app_state.0.session.get_untracked();
        spawn_local(async move {
            session::logout(&client, &mut s).await;
            app_state.0.sign_out();
            let _ = logging_out.try_set(false);
            let _ = navigate.try_with_value(|nav| nav(session::LOGIN_PATH, Default::default()));
        });
    };

    let user_label = move || {
        app_state.0.session.with(|s| {
            s.user
                .as_ref()
                .map(|u| format!("{} · {}", u.username, u.role))
                .unwrap_or_default()
        })
    };

    let children = StoredValue::new(children);

    view! {
        <div class="min-h-screen bg-background text-foreground">
            <header class="border-b border-border">
                <div class="mx-auto flex h-12 max-w-5xl items-center gap-4 px-4">
                    <a href="/" class="text-sm font-semibold">"ReportDeck"</a>
                    <nav class="flex items-center gap-1">
                        {NAV_ITEMS
                            .iter()
                            .map(|(href, label)| {
                                let href = *href;
                                let class = move || {
                                    if pathname.get().starts_with(href) {
                                        "rounded-md bg-accent px-3 py-1.5 text-sm font-medium"
                                    } else {
                                        "rounded-md px-3 py-1.5 text-sm text-muted-foreground hover:bg-accent"
                                    }
                                };
                                view! { <a href=href class=class>{*label}</a> }
                            })
                            .collect_view()}
                    </nav>
                    <div class="ml-auto flex items-center gap-3">
                        <span class="text-xs text-muted-foreground">{user_label}</span>
                        <Button
                            variant=ButtonVariant::Ghost
                            size=ButtonSize::Sm
                            attr:disabled=move || logging_out.get()
                            on:click=on_logout
                        >
                            "Log out"
                        </Button>
                    </div>
                </div>
            </header>
            <main class="mx-auto max-w-5xl px-4 py-6">
                {move || children.with_value(|c| c())}
            </main>
        </div>
    }
}

#[component]
pub fn RootAuthed(children: ChildrenFn) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let is_authenticated = move || app_state.0.session.with(|s| s.is_authenticated());

    // Store children so the view macro sees an `Fn` (not an `FnOnce`).
    let children = StoredValue::new(children);

    view! {
        <Show when=is_authenticated fallback=move || view! { <LoginPage /> }>
            <AppLayout>
                {move || children.with_value(|c| c())}
            </AppLayout>
        </Show>
    }
}

/// Editing views are closed to viewers.
#[component]
pub fn RequireEditor(children: ChildrenFn) -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let children = StoredValue::new(children);

    view! {
        <Show when=move || app_state.0.can_edit() fallback=|| view! { <RestrictedNotice /> }>
            {move || children.with_value(|c| c())}
        </Show>
    }
}

#[component]
fn RestrictedNotice() -> impl IntoView {
    view! {
        <div class="rounded-md border border-border bg-muted p-4 text-sm text-muted-foreground">
            "Your account can view documents but not edit them. Ask an administrator for access."
        </div>
    }
}

#[component]
pub fn RootPage() -> impl IntoView {
    view! {
        <RootAuthed>
            <ReportsPage />
        </RootAuthed>
    }
}

#[component]
pub fn NotFoundPage() -> impl IntoView {
    view! { <div class="px-4 py-8 text-xs text-muted-foreground">"Not found"</div> }
}

// Anchor styles matching the Button variants.
const LINK_PRIMARY_SM: &str = "inline-flex h-8 items-center gap-1.5 rounded-md bg-primary px-3 text-sm font-medium text-primary-foreground shadow-xs hover:bg-primary/90 [&_svg]:size-4";
const LINK_OUTLINE_XS: &str = "inline-flex h-7 items-center gap-1 rounded-md border bg-background px-2 text-xs font-medium shadow-xs hover:bg-accent";
const LINK_ICON: &str = "inline-flex size-8 items-center justify-center rounded-md hover:bg-accent [&_svg]:size-4";

/// Lifecycle of an editor page's initial fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LoadState {
    Loading,
    Ready,
    /// The document could not be loaded; nothing is editable.
    Failed,
}

impl LoadState {
    fn from_result<T, E>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => LoadState::Ready,
            Err(_) => LoadState::Failed,
        }
    }

    fn is_loading(self) -> bool {
        self == LoadState::Loading
    }

    fn is_editable(self) -> bool {
        self == LoadState::Ready
    }
}

/// Route id segment; anything unparsable is treated as absent.
fn parse_id<T: FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|s| s.parse().ok())
}

fn draft_error_message(app_state: &AppState, e: &DraftError) -> String {
    match e.api_error() {
        Some(api) => app_state.handle_error(api),
        None => e.to_string(),
    }
}

/// Date part of a server timestamp.
fn short_date(ts: &str) -> &str {
    ts.get(..10).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportId, TemplateId};

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id(Some("12".to_string())), Some(TemplateId(12)));
        assert_eq!(parse_id::<ReportId>(Some("new".to_string())), None);
        assert_eq!(parse_id::<ReportId>(None), None);
    }

    #[test]
    fn test_only_a_successful_load_is_editable() {
        let ok: Result<(), DraftError> = Ok(());
        let missing: Result<(), DraftError> = Err(DraftError::NotFound);
        assert_eq!(LoadState::from_result(&ok), LoadState::Ready);
        assert_eq!(LoadState::from_result(&missing), LoadState::Failed);
        assert!(LoadState::Ready.is_editable());
        assert!(!LoadState::Failed.is_editable());
        assert!(!LoadState::Loading.is_editable());
        assert!(!LoadState::Failed.is_loading());
    }

    #[test]
    fn test_short_date() {
        assert_eq!(short_date("2024-03-05T10:00:00"), "2024-03-05");
        assert_eq!(short_date("2024"), "2024");
        assert_eq!(short_date(""), "");
    }
}
