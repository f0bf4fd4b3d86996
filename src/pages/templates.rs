use super::{
    draft_error_message, parse_id, short_date, LoadState, LINK_ICON, LINK_OUTLINE_XS,
    LINK_PRIMARY_SM,
};
use crate::components::ui::{
    Button, ButtonSize, ButtonVariant, ConfirmDialog, DismissibleAlert, Input, Label, Spinner,
    Textarea,
};
use crate::drafts::{parse_template_document, DraftError, SaveOutcome, TemplateDraft, TemplateMeta};
use crate::editor::{BlockListEditor, BlockListView};
use crate::images::ImageGallery;
use crate::models::{Template, TemplateId};
use crate::state::AppContext;
use crate::util::browser::{download_bytes, read_bytes, take_selected_files};
use crate::util::{template_export_file_name, InFlight};
use icons::{Download, FileUp, Pencil, Plus, Trash2};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::{use_navigate, use_params};
use leptos_router::params::Params;
use leptos_router::NavigateOptions;

#[derive(Params, PartialEq, Clone, Debug)]
pub struct TemplateRouteParams {
    pub id: Option<String>,
}

#[component]
pub fn TemplatesPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let templates: RwSignal<Vec<Template>> = RwSignal::new(vec![]);
    let loading: RwSignal<bool> = RwSignal::new(false);
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let notice: RwSignal<Option<String>> = RwSignal::new(None);

    let delete_target: RwSignal<Option<(TemplateId, String)>> = RwSignal::new(None);
    let delete_open: RwSignal<bool> = RwSignal::new(false);
    let delete_busy: RwSignal<bool> = RwSignal::new(false);
    let importing: RwSignal<bool> = RwSignal::new(false);

    // Also runs after an import completes, possibly once the page is gone.
    let load = move || {
        let client = app_state.0.api_client.get_untracked();
        let _ = loading.try_set(true);
        spawn_local(async move {
            match client.list_templates().await {
                Ok(list) => {
                    let _ = templates.try_set(list);
                }
                Err(e) => {
                    let _ = error.try_set(Some(app_state.0.handle_error(&e)));
                }
            }
            let _ = loading.try_set(false);
        });
    };

    Effect::new(move |_| load());

    let on_export = move |id: TemplateId| {
        let client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            let result = match client.export_template(id).await {
                Ok(bytes) => download_bytes(&bytes, &template_export_file_name(id), "application/json"),
                Err(e) => Err(app_state.0.handle_error(&e)),
            };
            if let Err(e) = result {
                let _ = error.try_set(Some(e));
            }
        });
    };

    let on_import = move |ev: web_sys::Event| {
        let Some(file) = take_selected_files(&ev).into_iter().next() else {
            return;
        };
        let client = app_state.0.api_client.get_untracked();
        importing.set(true);
        error.set(None);
        spawn_local(async move {
            let parsed = match read_bytes(&file).await {
                Ok(raw) => parse_template_document(&raw),
                Err(e) => Err(DraftError::InvalidImport(e)),
            };
            match parsed {
                Ok(doc) => match client.import_template(&doc).await {
                    Ok(saved) => {
                        log::info!("imported template {} as {}", doc.name, saved.template_id);
                        let _ = notice.try_set(Some(format!("Imported \"{}\"", doc.name)));
                        load();
                    }
                    Err(e) => {
                        let _ = error.try_set(Some(app_state.0.handle_error(&e)));
                    }
                },
                Err(e) => {
                    let _ = error.try_set(Some(e.to_string()));
                }
            }
            let _ = importing.try_set(false);
        });
    };

    let on_confirm_delete = Callback::new(move |_| {
        let Some((id, _)) = delete_target.get_untracked() else {
            return;
        };
        let client = app_state.0.api_client.get_untracked();
        delete_busy.set(true);
        spawn_local(async move {
            match client.delete_template(id).await {
                Ok(()) => {
                    let _ = templates.try_update(|list| list.retain(|t| t.id != id));
                    let _ = delete_open.try_set(false);
                    let _ = delete_target.try_set(None);
                }
                Err(e) => {
                    let _ = error.try_set(Some(app_state.0.handle_error(&e)));
                    let _ = delete_open.try_set(false);
                }
            }
            let _ = delete_busy.try_set(false);
        });
    });

    let can_edit = move || app_state.0.can_edit();

    view! {
        <div class="space-y-4">
            <div class="flex items-center justify-between gap-2">
                <div class="space-y-1">
                    <h1 class="text-xl font-semibold">"Templates"</h1>
                    <p class="text-xs text-muted-foreground">"Reusable block layouts that new reports start from."</p>
                </div>
                <Show when=can_edit fallback=|| ().into_view()>
                    <div class="flex items-center gap-2">
                        <label class="inline-flex h-8 cursor-pointer items-center gap-1.5 rounded-md border px-3 text-sm hover:bg-accent">
                            <Show when=move || importing.get() fallback=|| view! { <FileUp /> }>
                                <Spinner />
                            </Show>
                            "Import"
                            <input type="file" accept="application/json,.json" class="hidden" on:change=on_import />
                        </label>
                        <a class=LINK_PRIMARY_SM href="/templates/new">
                            <Plus />
                            "New template"
                        </a>
                    </div>
                </Show>
            </div>

            <DismissibleAlert message=error />
            <DismissibleAlert message=notice success=true />

            <Show
                when=move || !templates.get().is_empty()
                fallback=move || view! {
                    <div class="rounded-md border border-dashed border-border px-4 py-8 text-center text-xs text-muted-foreground">
                        {move || if loading.get() { "Loading templates..." } else { "No templates yet." }}
                    </div>
                }
            >
                <div class="divide-y divide-border rounded-md border border-border">
                    <For
                        each=move || templates.get()
                        key=|t| (t.id, t.name.clone(), t.blocks.len())
                        children=move |t: Template| {
                            let id = t.id;
                            let name = t.name.clone();
                            view! {
                                <div class="flex items-center gap-3 px-3 py-2">
                                    <div class="min-w-0 flex-1">
                                        <div class="truncate text-sm font-medium">{t.name.clone()}</div>
                                        <div class="truncate text-xs text-muted-foreground">
                                            {format!("{} blocks · {}", t.blocks.len(), short_date(&t.created_at))}
                                            {(!t.description.is_empty()).then(|| format!(" · {}", t.description))}
                                        </div>
                                    </div>
                                    <Show when=can_edit fallback=|| ().into_view()>
                                        <a class=LINK_OUTLINE_XS href=format!("/reports/new/{id}")>"Use"</a>
                                        <a class=LINK_ICON title="Edit" href=format!("/templates/{id}/edit")>
                                            <Pencil />
                                        </a>
                                    </Show>
                                    <Button
                                        variant=ButtonVariant::Ghost
                                        size=ButtonSize::Icon
                                        attr:title="Export"
                                        on:click=move |_| on_export(id)
                                    >
                                        <Download />
                                    </Button>
                                    <Show when=can_edit fallback=|| ().into_view()>
                                        <Button
                                            variant=ButtonVariant::Ghost
                                            size=ButtonSize::Icon
                                            class="text-destructive"
                                            attr:title="Delete"
                                            on:click={
                                                let name = name.clone();
                                                move |_| {
                                                    delete_target.set(Some((id, name.clone())));
                                                    delete_open.set(true);
                                                }
                                            }
                                        >
                                            <Trash2 />
                                        </Button>
                                    </Show>
                                </div>
                            }
                        }
                    />
                </div>
            </Show>

            <ConfirmDialog
                open=delete_open
                title="Delete template"
                message=Signal::derive(move || {
                    delete_target
                        .get()
                        .map(|(_, name)| format!("Delete \"{name}\" and its images? Reports made from it are kept."))
                        .unwrap_or_default()
                })
                busy=delete_busy
                on_confirm=on_confirm_delete
            />
        </div>
    }
}

#[component]
pub fn TemplateEditorPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let params = use_params::<TemplateRouteParams>();
    let navigate = StoredValue::new(use_navigate());

    let template_id: RwSignal<Option<TemplateId>> = RwSignal::new(None);
    let name: RwSignal<String> = RwSignal::new(String::new());
    let description: RwSignal<String> = RwSignal::new(String::new());
    let editor: RwSignal<BlockListEditor> = RwSignal::new(BlockListEditor::new());

    let load_state: RwSignal<LoadState> = RwSignal::new(LoadState::Loading);
    let saving: RwSignal<bool> = RwSignal::new(false);
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let notice: RwSignal<Option<String>> = RwSignal::new(None);
    let save_guard = StoredValue::new_local(InFlight::new());

    let apply = move |d: TemplateDraft| {
        template_id.set(d.id);
        name.set(d.meta.name);
        description.set(d.meta.description);
        editor.set(d.editor);
    };

    Effect::new(move |_| {
        let Some(id) = parse_id::<TemplateId>(params.get().ok().and_then(|p| p.id)) else {
            apply(TemplateDraft::blank());
            load_state.set(LoadState::Ready);
            return;
        };
        let client = app_state.0.api_client.get_untracked();
        load_state.set(LoadState::Loading);
        error.set(None);
        spawn_local(async move {
            let loaded = TemplateDraft::load_existing(&client, id).await;
            let state = LoadState::from_result(&loaded);
            match loaded {
                Ok(d) => {
                    let _ = template_id.try_set(d.id);
                    let _ = name.try_set(d.meta.name);
                    let _ = description.try_set(d.meta.description);
                    let _ = editor.try_set(d.editor);
                }
                Err(e) => {
                    let _ = error.try_set(Some(draft_error_message(&app_state.0, &e)));
                }
            }
            let _ = load_state.try_set(state);
        });
    });

    let on_save = move |_| {
        if !load_state.get_untracked().is_editable() {
            return;
        }
        let draft = TemplateDraft {
            id: template_id.get_untracked(),
            meta: TemplateMeta {
                name: name.get_untracked(),
                description: description.get_untracked(),
            },
            editor: editor.get_untracked(),
        };
        let started = save_guard.with_value(|g| draft.begin_save(g));
        let (ticket, request) = match started {
            Ok(v) => v,
            Err(DraftError::SaveInFlight) => return,
            Err(e) => {
                error.set(Some(e.to_string()));
                return;
            }
        };

        let client = app_state.0.api_client.get_untracked();
        saving.set(true);
        error.set(None);
        spawn_local(async move {
            let _ticket = ticket;
            match request.submit(&client).await {
                Ok(outcome) => {
                    if let SaveOutcome::Created(id) = outcome {
                        let _ = template_id.try_set(Some(id));
                        let _ = navigate.try_with_value(|nav| {
                            nav(
                                &format!("/templates/{id}/edit"),
                                NavigateOptions {
                                    replace: true,
                                    ..Default::default()
                                },
                            )
                        });
                    }
                    let _ = notice.try_set(Some("Template saved".to_string()));
                }
                Err(e) => {
                    let _ = error.try_set(Some(draft_error_message(&app_state.0, &e)));
                }
            }
            let _ = saving.try_set(false);
        });
    };

    view! {
        <div class="space-y-4">
            <div class="flex items-center justify-between gap-2">
                <div class="space-y-1">
                    <a href="/templates" class="text-xs text-muted-foreground hover:underline">"← Templates"</a>
                    <h1 class="text-xl font-semibold">
                        {move || if template_id.get().is_some() { "Edit template" } else { "New template" }}
                    </h1>
                </div>
                <Show when=move || load_state.get().is_editable() fallback=|| ().into_view()>
                    <Button size=ButtonSize::Sm attr:disabled=move || saving.get() on:click=on_save>
                        <Show when=move || saving.get() fallback=|| ().into_view()>
                            <Spinner />
                        </Show>
                        {move || if saving.get() { "Saving..." } else { "Save" }}
                    </Button>
                </Show>
            </div>

            <DismissibleAlert message=error />
            <DismissibleAlert message=notice success=true />

            <Show
                when=move || load_state.get().is_editable()
                fallback=move || {
                    if load_state.get().is_loading() {
                        view! {
                            <div class="flex items-center gap-2 text-xs text-muted-foreground">
                                <Spinner />
                                "Loading template..."
                            </div>
                        }
                        .into_any()
                    } else {
                        view! {
                            <div class="rounded-md border border-dashed border-border px-4 py-8 text-center text-xs text-muted-foreground">
                                "This template could not be opened. "
                                <a href="/templates" class="underline">"Back to templates"</a>
                            </div>
                        }
                        .into_any()
                    }
                }
            >
                <div class="grid gap-3">
                    <div class="flex flex-col gap-1.5">
                        <Label html_for="template-name" class="text-xs">"Name"</Label>
                        <Input id="template-name" bind_value=name placeholder="Web application pentest" class="h-8 text-sm" />
                    </div>
                    <div class="flex flex-col gap-1.5">
                        <Label class="text-xs">"Description"</Label>
                        <Textarea bind_value=description rows=2 class="font-sans text-sm" />
                    </div>
                </div>

                <BlockListView editor=editor />

                {move || template_id.get().map(|id| view! { <ImageGallery template_id=id /> })}
            </Show>
        </div>
    }
}
