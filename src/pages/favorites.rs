use crate::components::ui::{
    Button, ButtonSize, ButtonVariant, ConfirmDialog, DismissibleAlert, Input, Label, Textarea,
};
use crate::favorites::FavoriteEdit;
use crate::models::{FavoriteBlock, FavoriteId};
use crate::state::AppContext;
use crate::util::{preview, PREVIEW_LEN};
use icons::{Pencil, Trash2};
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn FavoritesPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let favorites: RwSignal<Vec<FavoriteBlock>> = RwSignal::new(vec![]);
    let loading: RwSignal<bool> = RwSignal::new(false);
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let notice: RwSignal<Option<String>> = RwSignal::new(None);

    // Inline edit
    let editing: RwSignal<Option<FavoriteId>> = RwSignal::new(None);
    let edit_name: RwSignal<String> = RwSignal::new(String::new());
    let edit_title: RwSignal<String> = RwSignal::new(String::new());
    let edit_content: RwSignal<String> = RwSignal::new(String::new());
    let edit_busy: RwSignal<bool> = RwSignal::new(false);

    let delete_target: RwSignal<Option<(FavoriteId, String)>> = RwSignal::new(None);
    let delete_open: RwSignal<bool> = RwSignal::new(false);
    let delete_busy: RwSignal<bool> = RwSignal::new(false);

    Effect::new(move |_| {
        let client = app_state.0.api_client.get_untracked();
        loading.set(true);
        spawn_local(async move {
            match client.list_favorites().await {
                Ok(list) => {
                    let _ = favorites.try_set(list);
                }
                Err(e) => {
                    let _ = error.try_set(Some(app_state.0.handle_error(&e)));
                }
            }
            let _ = loading.try_set(false);
        });
    });

    let start_edit = move |f: &FavoriteBlock| {
        let form = FavoriteEdit::from_favorite(f);
        edit_name.set(form.name);
        edit_title.set(form.title);
        edit_content.set(form.content);
        editing.set(Some(f.id));
    };

    let submit_edit = move || {
        let Some(id) = editing.get_untracked() else {
            return;
        };
        if edit_busy.get_untracked() {
            return;
        }
        let form = FavoriteEdit {
            name: edit_name.get_untracked(),
            title: edit_title.get_untracked(),
            content: edit_content.get_untracked(),
        };
        let req = match form.to_request() {
            Ok(r) => r,
            Err(e) => {
                error.set(Some(e.to_string()));
                return;
            }
        };
        let client = app_state.0.api_client.get_untracked();
        edit_busy.set(true);
        spawn_local(async move {
            match client.update_favorite(id, &req).await {
                Ok(saved) => {
                    let _ = favorites.try_update(|list| {
                        if let Some(slot) = list.iter_mut().find(|f| f.id == saved.id) {
                            *slot = saved.clone();
                        }
                    });
                    let _ = editing.try_set(None);
                    let _ = notice.try_set(Some(format!("Updated \"{}\"", saved.name)));
                }
                Err(e) => {
                    let _ = error.try_set(Some(app_state.0.handle_error(&e)));
                }
            }
            let _ = edit_busy.try_set(false);
        });
    };

    let on_confirm_delete = Callback::new(move |_| {
        let Some((id, _)) = delete_target.get_untracked() else {
            return;
        };
        let client = app_state.0.api_client.get_untracked();
        delete_busy.set(true);
        spawn_local(async move {
            match client.delete_favorite(id).await {
                Ok(()) => {
                    let _ = favorites.try_update(|list| list.retain(|f| f.id != id));
                    let _ = delete_target.try_set(None);
                    if editing.try_get_untracked().flatten() == Some(id) {
                        let _ = editing.try_set(None);
                    }
                }
                Err(e) => {
                    let _ = error.try_set(Some(app_state.0.handle_error(&e)));
                }
            }
            let _ = delete_open.try_set(false);
            let _ = delete_busy.try_set(false);
        });
    });

    view! {
        <div class="space-y-4">
            <div class="space-y-1">
                <h1 class="text-xl font-semibold">"Favorite blocks"</h1>
                <p class="text-xs text-muted-foreground">
                    "Saved from the star button on any block. Inserting one copies it; later edits here do not touch existing documents."
                </p>
            </div>

            <DismissibleAlert message=error />
            <DismissibleAlert message=notice success=true />

            <Show
                when=move || !favorites.get().is_empty()
                fallback=move || view! {
                    <div class="rounded-md border border-dashed border-border px-4 py-8 text-center text-xs text-muted-foreground">
                        {move || if loading.get() { "Loading favorites..." } else { "No favorite blocks yet." }}
                    </div>
                }
            >
                <div class="space-y-2">
                    <For
                        each=move || favorites.get()
                        key=|f| (f.id, f.updated_at.clone(), f.name.clone())
                        children=move |f: FavoriteBlock| {
                            let id = f.id;
                            let fav = StoredValue::new(f.clone());
                            view! {
                                <div class="rounded-md border border-border p-3">
                                    <Show
                                        when=move || editing.get() == Some(id)
                                        fallback=move || {
                                            let f = fav.get_value();
                                            let name = f.name.clone();
                                            view! {
                                                <div class="flex items-start gap-2">
                                                    <div class="min-w-0 flex-1 space-y-0.5">
                                                        <div class="flex items-center gap-2">
                                                            <span class="text-sm font-medium">{f.name.clone()}</span>
                                                            {(!f.block_type.is_text()).then(|| view! {
                                                                <span class="rounded bg-muted px-1.5 py-0.5 text-[10px] uppercase text-muted-foreground">
                                                                    {f.block_type.to_string()}
                                                                </span>
                                                            })}
                                                            {f.page_break_before.then(|| view! {
                                                                <span class="text-[10px] text-muted-foreground">"page break"</span>
                                                            })}
                                                        </div>
                                                        {(!f.title.is_empty()).then(|| view! {
                                                            <div class="text-xs text-muted-foreground">{f.title.clone()}</div>
                                                        })}
                                                        <div class="whitespace-pre-wrap text-xs text-muted-foreground">
                                                            {preview(&f.content, PREVIEW_LEN)}
                                                        </div>
                                                    </div>
                                                    <Button
                                                        variant=ButtonVariant::Ghost
                                                        size=ButtonSize::Icon
                                                        attr:title="Edit"
                                                        on:click=move |_| fav.with_value(|f| start_edit(f))
                                                    >
                                                        <Pencil />
                                                    </Button>
                                                    <Button
                                                        variant=ButtonVariant::Ghost
                                                        size=ButtonSize::Icon
                                                        class="text-destructive"
                                                        attr:title="Delete"
                                                        on:click=move |_| {
                                                            delete_target.set(Some((id, name.clone())));
                                                            delete_open.set(true);
                                                        }
                                                    >
                                                        <Trash2 />
                                                    </Button>
                                                </div>
                                            }
                                        }
                                    >
                                        <form
                                            class="space-y-2"
                                            on:submit=move |ev: web_sys::SubmitEvent| {
                                                ev.prevent_default();
                                                submit_edit();
                                            }
                                        >
                                            <div class="flex flex-col gap-1.5">
                                                <Label class="text-xs">"Name"</Label>
                                                <Input bind_value=edit_name required=true class="h-8 text-sm" />
                                            </div>
                                            <div class="flex flex-col gap-1.5">
                                                <Label class="text-xs">"Block title"</Label>
                                                <Input bind_value=edit_title class="h-8 text-sm" />
                                            </div>
                                            <div class="flex flex-col gap-1.5">
                                                <Label class="text-xs">"Content"</Label>
                                                <Textarea bind_value=edit_content rows=8 class="text-sm" />
                                            </div>
                                            <div class="flex items-center justify-end gap-2">
                                                <Button
                                                    variant=ButtonVariant::Outline
                                                    size=ButtonSize::Sm
                                                    attr:r#type="button"
                                                    on:click=move |_| editing.set(None)
                                                >
                                                    "Cancel"
                                                </Button>
                                                <Button size=ButtonSize::Sm attr:disabled=move || edit_busy.get()>
                                                    {move || if edit_busy.get() { "Saving..." } else { "Save" }}
                                                </Button>
                                            </div>
                                        </form>
                                    </Show>
                                </div>
                            }
                        }
                    />
                </div>
            </Show>

            <ConfirmDialog
                open=delete_open
                title="Delete favorite"
                message=Signal::derive(move || {
                    delete_target
                        .get()
                        .map(|(_, name)| format!("Delete \"{name}\"? Blocks already copied into documents stay as they are."))
                        .unwrap_or_default()
                })
                busy=delete_busy
                on_confirm=on_confirm_delete
            />
        </div>
    }
}
