use super::{BlockListEditor, DragGesture, EditorError, PromoteError};
use crate::blocks::{Block, BlockField, BlockKey};
use crate::components::ui::{
    Button, ButtonSize, ButtonVariant, ConfirmDialog, DismissibleAlert, Input, Label, Modal,
    ModalDescription, ModalFooter, ModalHeader, ModalTitle, Spinner,
};
use crate::favorites::{self, picker_entries, PickerEntry};
use crate::models::{FavoriteBlock, FavoriteId};
use crate::placeholders::{self, Placeholder};
use crate::state::AppContext;
use crate::util::InFlight;
use icons::{ArrowDown, ArrowUp, GripVertical, Plus, Star, Trash2};
use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::window_event_listener;
use wasm_bindgen::JsCast;

/// Where the block picker will put the chosen block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InsertAt {
    End,
    After(BlockKey),
}

fn read_field(editor: RwSignal<BlockListEditor>, key: BlockKey, f: fn(&Block) -> String) -> String {
    editor.with(|e| e.index_of(key).and_then(|i| e.get(i)).map(f).unwrap_or_default())
}

fn write_field(editor: RwSignal<BlockListEditor>, key: BlockKey, field: BlockField) {
    editor.update(|e| {
        if let Some(i) = e.index_of(key) {
            let _ = e.update_block_field(i, field);
        }
    });
}

/// Target slot for the up/down buttons; `None` at either end of the list.
fn nudge_destination(index: usize, len: usize, down: bool) -> Option<usize> {
    if down {
        (index + 1 < len).then_some(index + 1)
    } else {
        index.checked_sub(1)
    }
}

/// Cursor in the lower half of the element under the pointer.
fn pointer_in_lower_half(ev: &web_sys::DragEvent) -> bool {
    ev.current_target()
        .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        .map(|el| el.get_bounding_client_rect())
        .map(|rect| (ev.client_y() as f64) >= rect.top() + rect.height() / 2.0)
        .unwrap_or(true)
}

#[component]
pub fn BlockListView(
    editor: RwSignal<BlockListEditor>,
    #[prop(into, default = "Blocks".to_string())] heading: String,
) -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let notice: RwSignal<Option<String>> = RwSignal::new(None);

    let drag: RwSignal<DragGesture> = RwSignal::new(DragGesture::default());
    let drop_hint: RwSignal<Option<(BlockKey, bool)>> = RwSignal::new(None);

    // Block picker
    let picker_target: RwSignal<Option<InsertAt>> = RwSignal::new(None);
    let favorites: RwSignal<Vec<FavoriteBlock>> = RwSignal::new(vec![]);
    let favorites_loading: RwSignal<bool> = RwSignal::new(false);
    let favorite_to_delete: RwSignal<Option<(FavoriteId, String)>> = RwSignal::new(None);
    let delete_open: RwSignal<bool> = RwSignal::new(false);
    let delete_busy: RwSignal<bool> = RwSignal::new(false);

    // Promote to favorite
    let promote_key: RwSignal<Option<BlockKey>> = RwSignal::new(None);
    let promote_name: RwSignal<String> = RwSignal::new(String::new());
    let promote_busy: RwSignal<bool> = RwSignal::new(false);
    let promote_guard = StoredValue::new_local(InFlight::new());

    let load_favorites = move || {
        let client = app_state.0.api_client.get_untracked();
        let _ = favorites_loading.try_set(true);
        spawn_local(async move {
            match client.list_favorites().await {
                Ok(list) => {
                    let _ = favorites.try_set(list);
                }
                Err(e) => {
                    let _ = error.try_set(Some(app_state.0.handle_error(&e)));
                }
            }
            let _ = favorites_loading.try_set(false);
        });
    };

    let open_picker = move |at: InsertAt| {
        picker_target.set(Some(at));
        load_favorites();
    };

    let on_pick = Callback::new(move |entry: PickerEntry| {
        let Some(at) = picker_target.get_untracked() else {
            return;
        };
        let favorite = entry.favorite();
        editor.update(|e| match at {
            InsertAt::End => {
                e.append_block(favorite);
            }
            InsertAt::After(key) => {
                let result = e
                    .index_of(key)
                    .ok_or(EditorError::BlockNotFound(key))
                    .and_then(|i| e.insert_block_after(i, favorite));
                if let Err(err) = result {
                    error.set(Some(err.to_string()));
                }
            }
        });
        picker_target.set(None);
    });

    let on_confirm_delete_favorite = Callback::new(move |_| {
        let Some((id, _)) = favorite_to_delete.get_untracked() else {
            return;
        };
        let client = app_state.0.api_client.get_untracked();
        delete_busy.set(true);
        spawn_local(async move {
            match client.delete_favorite(id).await {
                Ok(()) => {
                    let _ = delete_open.try_set(false);
                    let _ = favorite_to_delete.try_set(None);
                    load_favorites();
                }
                Err(e) => {
                    let _ = error.try_set(Some(app_state.0.handle_error(&e)));
                }
            }
            let _ = delete_busy.try_set(false);
        });
    });

    let start_promote = Callback::new(move |key: BlockKey| {
        let prompt = editor.with_untracked(|e| {
            e.index_of(key)
                .and_then(|i| e.get(i))
                .ok_or(EditorError::BlockNotFound(key))
                .and_then(favorites::promotion_prompt)
        });
        match prompt {
            Ok(suggestion) => {
                promote_name.set(suggestion);
                promote_key.set(Some(key));
            }
            Err(e) => error.set(Some(e.to_string())),
        }
    });

    let submit_promote = move || {
        let Some(key) = promote_key.get_untracked() else {
            return;
        };
        let snapshot = editor.get_untracked();
        let Some(index) = snapshot.index_of(key) else {
            promote_key.set(None);
            return;
        };
        let Some(ticket) = promote_guard.with_value(|g| g.try_begin()) else {
            return;
        };
        let name = promote_name.get_untracked();
        let client = app_state.0.api_client.get_untracked();

        promote_busy.set(true);
        spawn_local(async move {
            let _ticket = ticket;
            match snapshot.promote_to_favorite(index, &name, &client).await {
                Ok(saved) => {
                    let _ = promote_key.try_set(None);
                    let _ = notice.try_set(Some(format!("Saved \"{}\" to favorites", saved.name)));
                }
                Err(PromoteError::Store(e)) => {
                    let _ = error.try_set(Some(app_state.0.handle_error(&e)));
                }
                Err(e) => {
                    let _ = error.try_set(Some(e.to_string()));
                    let _ = promote_key.try_set(None);
                }
            }
            let _ = promote_busy.try_set(false);
        });
    };

    let block_keys = move || editor.with(|e| e.blocks().iter().map(|b| b.key).collect::<Vec<_>>());
    let unknown_count = move || {
        editor.with(|e| {
            e.blocks()
                .iter()
                .map(|b| placeholders::unknown_tokens(&b.content).len())
                .sum::<usize>()
        })
    };

    view! {
        <div class="space-y-3">
            <div class="flex items-center justify-between gap-2">
                <div class="flex items-center gap-2">
                    <div class="text-sm font-medium">{heading}</div>
                    <Show when=move || { unknown_count() > 0 } fallback=|| ().into_view()>
                        <span class="text-xs text-destructive">
                            {move || format!("{} unknown placeholder(s)", unknown_count())}
                        </span>
                    </Show>
                </div>
                <div class="flex items-center gap-2">
                    <PlaceholderMenu editor=editor error=error />
                    <Button
                        size=ButtonSize::Sm
                        on:click=move |_| open_picker(InsertAt::End)
                    >
                        <Plus />
                        "Add block"
                    </Button>
                </div>
            </div>

            <DismissibleAlert message=error />
            <DismissibleAlert message=notice success=true />

            <Show
                when=move || !editor.with(BlockListEditor::is_empty)
                fallback=|| view! {
                    <div class="rounded-md border border-dashed border-border px-4 py-8 text-center text-xs text-muted-foreground">
                        "No blocks yet. Add one to start."
                    </div>
                }
            >
                <div
                    class="space-y-3"
                    on:dragend=move |_| {
                        drag.update(DragGesture::cancel);
                        drop_hint.set(None);
                    }
                >
                    <For
                        each=block_keys
                        key=|k| *k
                        children=move |key: BlockKey| view! {
                            <BlockCard
                                editor=editor
                                block_key=key
                                drag=drag
                                drop_hint=drop_hint
                                on_insert_after=Callback::new(move |k| open_picker(InsertAt::After(k)))
                                on_promote=start_promote
                            />
                        }
                    />
                </div>
            </Show>

            <Modal open=Signal::derive(move || picker_target.get().is_some()) class="max-w-lg">
                <ModalHeader>
                    <ModalTitle>"Choose a block"</ModalTitle>
                    <ModalDescription>"Start empty or copy one of your favorites."</ModalDescription>
                </ModalHeader>
                <div class="max-h-[60vh] space-y-2 overflow-y-auto">
                    <Show when=move || favorites_loading.get() fallback=|| ().into_view()>
                        <div class="flex items-center gap-2 text-xs text-muted-foreground">
                            <Spinner />
                            "Loading favorites..."
                        </div>
                    </Show>
                    {move || {
                        picker_entries(&favorites.get())
                            .into_iter()
                            .map(|entry| {
                                let preview = entry.preview();
                                let (label, subtitle, fav) = match &entry {
                                    PickerEntry::Empty => ("Empty block".to_string(), String::new(), None),
                                    PickerEntry::Favorite(f) => (f.name.clone(), f.title.clone(), Some((f.id, f.name.clone()))),
                                };
                                let entry_for_pick = entry.clone();
                                view! {
                                    <div class="flex items-start gap-2 rounded-md border border-border p-2 hover:bg-accent">
                                        <button
                                            type="button"
                                            class="min-w-0 flex-1 text-left"
                                            on:click=move |_| on_pick.run(entry_for_pick.clone())
                                        >
                                            <div class="text-sm font-medium">{label}</div>
                                            {(!subtitle.is_empty()).then(|| view! {
                                                <div class="text-xs text-muted-foreground">{subtitle}</div>
                                            })}
                                            <div class="whitespace-pre-wrap text-xs text-muted-foreground">{preview}</div>
                                        </button>
                                        {fav.map(|(id, name)| view! {
                                            <Button
                                                variant=ButtonVariant::Ghost
                                                size=ButtonSize::Icon
                                                attr:title="Remove from favorites"
                                                on:click=move |_| {
                                                    favorite_to_delete.set(Some((id, name.clone())));
                                                    delete_open.set(true);
                                                }
                                            >
                                                <Trash2 />
                                            </Button>
                                        })}
                                    </div>
                                }
                            })
                            .collect_view()
                    }}
                </div>
                <ModalFooter>
                    <Button
                        variant=ButtonVariant::Outline
                        size=ButtonSize::Sm
                        on:click=move |_| picker_target.set(None)
                    >
                        "Cancel"
                    </Button>
                </ModalFooter>
            </Modal>

            <ConfirmDialog
                open=delete_open
                title="Remove favorite"
                message=Signal::derive(move || {
                    favorite_to_delete
                        .get()
                        .map(|(_, name)| format!("Remove \"{name}\" from your favorites? This cannot be undone."))
                        .unwrap_or_default()
                })
                confirm_label="Remove"
                busy=delete_busy
                on_confirm=on_confirm_delete_favorite
            />

            <Modal open=Signal::derive(move || promote_key.get().is_some())>
                <ModalHeader>
                    <ModalTitle>"Save as favorite"</ModalTitle>
                    <ModalDescription>"The block's title, content and layout are copied."</ModalDescription>
                </ModalHeader>
                <form
                    class="space-y-1"
                    on:submit=move |ev: web_sys::SubmitEvent| {
                        ev.prevent_default();
                        submit_promote();
                    }
                >
                    <Label class="text-xs">"Name"</Label>
                    <Input bind_value=promote_name class="h-8 text-sm" />
                    <ModalFooter>
                        <Button
                            variant=ButtonVariant::Outline
                            size=ButtonSize::Sm
                            attr:r#type="button"
                            on:click=move |_| promote_key.set(None)
                        >
                            "Cancel"
                        </Button>
                        <Button size=ButtonSize::Sm attr:disabled=move || promote_busy.get()>
                            {move || if promote_busy.get() { "Saving..." } else { "Save" }}
                        </Button>
                    </ModalFooter>
                </form>
            </Modal>
        </div>
    }
}

#[component]
fn BlockCard(
    editor: RwSignal<BlockListEditor>,
    block_key: BlockKey,
    drag: RwSignal<DragGesture>,
    drop_hint: RwSignal<Option<(BlockKey, bool)>>,
    on_insert_after: Callback<BlockKey>,
    on_promote: Callback<BlockKey>,
) -> impl IntoView {
    let key = block_key;
    let position = move || editor.with(|e| e.index_of(key));
    let is_active = move || editor.with(|e| e.active_key() == Some(key));

    let card_class = move || {
        let base = "rounded-md border bg-card p-3 shadow-xs transition-colors";
        let hint = match drop_hint.get() {
            Some((k, false)) if k == key => " border-t-2 border-t-primary",
            Some((k, true)) if k == key => " border-b-2 border-b-primary",
            _ => "",
        };
        let active = if is_active() { " ring-1 ring-primary/40" } else { "" };
        format!("{base}{hint}{active}")
    };

    let focus = move || {
        editor.update(|e| {
            if let Some(i) = e.index_of(key) {
                let _ = e.set_active(i);
            }
        });
    };

    let nudge = move |down: bool| {
        editor.update(|e| {
            let Some(i) = e.index_of(key) else {
                return;
            };
            if let Some(dst) = nudge_destination(i, e.len(), down) {
                let _ = e.reorder(i, dst);
            }
        });
    };

    let tokens = move || {
        let content = read_field(editor, key, |b| b.content.clone());
        placeholders::tokens_in(&content)
    };

    view! {
        <div
            class=card_class
            on:dragover=move |ev: web_sys::DragEvent| {
                if !drag.with_untracked(DragGesture::is_dragging) {
                    return;
                }
                ev.prevent_default();
                if let Some(dt) = ev.data_transfer() {
                    dt.set_drop_effect("move");
                }
                drop_hint.set(Some((key, pointer_in_lower_half(&ev))));
            }
            on:dragleave=move |_| {
                if drop_hint.get_untracked().map(|(k, _)| k) == Some(key) {
                    drop_hint.set(None);
                }
            }
            on:drop=move |ev: web_sys::DragEvent| {
                ev.prevent_default();
                let after = pointer_in_lower_half(&ev);
                drop_hint.set(None);
                let snapshot = editor.get_untracked();
                let Some((src, dst)) = drag
                    .try_update(|g| g.drop_on(&snapshot, key, after))
                    .flatten()
                else {
                    return;
                };
                editor.update(|e| {
                    let _ = e.reorder(src, dst);
                });
            }
        >
            <div class="mb-2 flex items-center gap-2">
                <span
                    class="cursor-grab text-muted-foreground"
                    title="Drag to reorder"
                    draggable="true"
                    on:dragstart=move |ev: web_sys::DragEvent| {
                        if let Some(dt) = ev.data_transfer() {
                            let _ = dt.set_data("text/plain", &key.to_string());
                            dt.set_effect_allowed("move");
                        }
                        drag.update(|g| g.start(key));
                    }
                >
                    <GripVertical />
                </span>
                <span class="text-xs tabular-nums text-muted-foreground">
                    {move || position().map(|i| format!("#{}", i + 1)).unwrap_or_default()}
                </span>
                <input
                    class="h-8 min-w-0 flex-1 rounded-md border border-input bg-transparent px-2 text-sm"
                    placeholder="Block title"
                    prop:value=move || read_field(editor, key, |b| b.title.clone())
                    on:input=move |ev| write_field(editor, key, BlockField::Title(event_target_value(&ev)))
                    on:focus=move |_| focus()
                />
                <Show
                    when=move || !editor.with(|e| e.index_of(key).and_then(|i| e.get(i)).map(|b| b.block_type.is_text()).unwrap_or(true))
                    fallback=|| ().into_view()
                >
                    <span class="rounded bg-muted px-1.5 py-0.5 text-[10px] uppercase text-muted-foreground">
                        {move || read_field(editor, key, |b| b.block_type.to_string())}
                    </span>
                </Show>
                <label class="flex items-center gap-1 text-xs text-muted-foreground">
                    <input
                        type="checkbox"
                        prop:checked=move || {
                            editor.with(|e| e.index_of(key).and_then(|i| e.get(i)).map(|b| b.page_break_before).unwrap_or(false))
                        }
                        on:change=move |ev| write_field(editor, key, BlockField::PageBreakBefore(event_target_checked(&ev)))
                    />
                    "Page break"
                </label>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    attr:title="Move up"
                    attr:disabled=move || position() == Some(0)
                    on:click=move |_| nudge(false)
                >
                    <ArrowUp />
                </Button>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    attr:title="Move down"
                    attr:disabled=move || position().map(|i| i + 1) == Some(editor.with(BlockListEditor::len))
                    on:click=move |_| nudge(true)
                >
                    <ArrowDown />
                </Button>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    attr:title="Save as favorite"
                    on:click=move |_| on_promote.run(key)
                >
                    <Star />
                </Button>
                <Button
                    variant=ButtonVariant::Ghost
                    size=ButtonSize::Icon
                    attr:title="Remove block"
                    on:click=move |_| {
                        editor.update(|e| {
                            let _ = e.remove_block(key);
                        });
                    }
                >
                    <Trash2 />
                </Button>
            </div>

            <textarea
                class="min-h-32 w-full rounded-md border border-input bg-transparent px-3 py-2 font-mono text-sm"
                placeholder="Markdown content"
                rows=8
                prop:value=move || read_field(editor, key, |b| b.content.clone())
                on:input=move |ev| write_field(editor, key, BlockField::Content(event_target_value(&ev)))
                on:focus=move |_| focus()
            />

            <div class="mt-2 flex flex-wrap items-center justify-between gap-2">
                <div class="flex flex-wrap gap-1">
                    {move || {
                        tokens()
                            .into_iter()
                            .map(|t| {
                                let known = placeholders::lookup(&t);
                                let class = match known {
                                    Some(p) if p.is_legacy() => "rounded bg-warning/20 px-1.5 py-0.5 font-mono text-[10px]",
                                    Some(_) => "rounded bg-muted px-1.5 py-0.5 font-mono text-[10px]",
                                    None => "rounded bg-destructive/15 px-1.5 py-0.5 font-mono text-[10px] text-destructive",
                                };
                                let title = match known {
                                    Some(p) => match p.replaced_by {
                                        Some(r) => format!("{} (use {r})", p.label),
                                        None => p.label.to_string(),
                                    },
                                    None => "Unknown placeholder; it will be printed as-is".to_string(),
                                };
                                view! { <span class=class title=title>{t}</span> }
                            })
                            .collect_view()
                    }}
                </div>
                <Button
                    variant=ButtonVariant::Outline
                    size=ButtonSize::Xs
                    on:click=move |_| on_insert_after.run(key)
                >
                    <Plus />
                    "Insert below"
                </Button>
            </div>
        </div>
    }
}

/// Catalog dropdown that appends a token to the active block.
#[component]
pub fn PlaceholderMenu(
    editor: RwSignal<BlockListEditor>,
    error: RwSignal<Option<String>>,
) -> impl IntoView {
    let open: RwSignal<bool> = RwSignal::new(false);

    let key_handle = window_event_listener(ev::keydown, move |ev: web_sys::KeyboardEvent| {
        if ev.key() == "Escape" && open.try_get_untracked() == Some(true) {
            open.set(false);
        }
    });
    on_cleanup(move || key_handle.remove());

    let insert = move |p: &'static Placeholder| {
        let result = editor
            .try_update(|e| e.insert_placeholder_into_active_block(p.token))
            .unwrap_or(Err(EditorError::NoActiveBlock));
        match result {
            Ok(_) => open.set(false),
            Err(e) => {
                error.set(Some(e.to_string()));
                open.set(false);
            }
        }
    };

    let item = move |p: &'static Placeholder| {
        view! {
            <button
                type="button"
                class="flex w-full flex-col items-start rounded px-2 py-1 text-left hover:bg-accent"
                on:mousedown=move |ev: web_sys::MouseEvent| ev.prevent_default()
                on:click=move |_| insert(p)
            >
                <span class="font-mono text-xs">{p.token}</span>
                <span class="text-[11px] text-muted-foreground">{p.label}" · "{p.description}</span>
            </button>
        }
    };

    view! {
        <div class="relative">
            <Button
                variant=ButtonVariant::Outline
                size=ButtonSize::Sm
                on:mousedown=move |ev: web_sys::MouseEvent| ev.prevent_default()
                on:click=move |_| open.update(|o| *o = !*o)
            >
                "{{ }} Placeholder"
            </Button>
            <Show when=move || open.get() fallback=|| ().into_view()>
                <div class="absolute right-0 z-40 mt-1 max-h-80 w-72 overflow-y-auto rounded-md border border-border bg-background p-1 shadow-lg">
                    {placeholders::catalog()
                        .iter()
                        .filter(|p| !p.is_legacy())
                        .map(item)
                        .collect_view()}
                    <div class="mt-1 border-t border-border px-2 pt-1 text-[10px] uppercase text-muted-foreground">
                        "Older tokens"
                    </div>
                    {placeholders::catalog()
                        .iter()
                        .filter(|p| p.is_legacy())
                        .map(item)
                        .collect_view()}
                </div>
            </Show>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nudge_stops_at_list_ends() {
        assert_eq!(nudge_destination(0, 3, false), None);
        assert_eq!(nudge_destination(2, 3, true), None);
        assert_eq!(nudge_destination(1, 3, false), Some(0));
        assert_eq!(nudge_destination(1, 3, true), Some(2));
        assert_eq!(nudge_destination(0, 1, true), None);
    }

    #[test]
    fn test_nudge_down_moves_block_one_slot() {
        let mut e = BlockListEditor::new();
        let a = e.append_block(None);
        let b = e.append_block(None);
        let dst = nudge_destination(0, e.len(), true).expect("room below");
        e.reorder(0, dst).expect("valid move");
        assert_eq!(e.index_of(a), Some(1));
        assert_eq!(e.index_of(b), Some(0));
    }
}
