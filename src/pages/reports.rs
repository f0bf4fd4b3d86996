use super::{draft_error_message, parse_id, short_date, LoadState, LINK_ICON, LINK_PRIMARY_SM};
use crate::components::ui::{
    Button, ButtonSize, ButtonVariant, ConfirmDialog, DismissibleAlert, Input, Label, Spinner,
};
use crate::drafts::{DraftError, ReportDraft, ReportMeta, SaveOutcome};
use crate::editor::{BlockListEditor, BlockListView};
use crate::models::{Report, ReportId, Template, TemplateId};
use crate::state::AppContext;
use crate::util::browser::download_bytes;
use crate::util::{report_pdf_file_name, InFlight};
use icons::{FileDown, Pencil, Plus, Trash2};
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::{use_navigate, use_params};
use leptos_router::params::Params;

#[derive(Params, PartialEq, Clone, Debug)]
pub struct ReportRouteParams {
    pub id: Option<String>,
    pub template_id: Option<String>,
}

/// What a report editor route starts from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReportSource {
    Blank,
    Template(TemplateId),
    Existing(ReportId),
}

impl ReportSource {
    fn from_params(p: &ReportRouteParams) -> Self {
        if let Some(id) = parse_id::<ReportId>(p.id.clone()) {
            return ReportSource::Existing(id);
        }
        match parse_id::<TemplateId>(p.template_id.clone()) {
            Some(t) => ReportSource::Template(t),
            None => ReportSource::Blank,
        }
    }
}

#[component]
pub fn ReportsPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let navigate = StoredValue::new(use_navigate());

    let reports: RwSignal<Vec<Report>> = RwSignal::new(vec![]);
    let templates: RwSignal<Vec<Template>> = RwSignal::new(vec![]);
    let loading: RwSignal<bool> = RwSignal::new(false);
    let error: RwSignal<Option<String>> = RwSignal::new(None);

    let pdf_busy: RwSignal<Option<ReportId>> = RwSignal::new(None);
    let delete_target: RwSignal<Option<(ReportId, String)>> = RwSignal::new(None);
    let delete_open: RwSignal<bool> = RwSignal::new(false);
    let delete_busy: RwSignal<bool> = RwSignal::new(false);

    Effect::new(move |_| {
        let client = app_state.0.api_client.get_untracked();
        let with_templates = app_state.0.can_edit();
        loading.set(true);
        spawn_local(async move {
            match client.list_reports().await {
                Ok(list) => {
                    let _ = reports.try_set(list);
                }
                Err(e) => {
                    let _ = error.try_set(Some(app_state.0.handle_error(&e)));
                }
            }
            let _ = loading.try_set(false);

            if with_templates {
                match client.list_templates().await {
                    Ok(list) => {
                        let _ = templates.try_set(list);
                    }
                    Err(e) => log::warn!("template list unavailable: {e}"),
                }
            }
        });
    });

    let on_pdf = move |id: ReportId, number: String| {
        if pdf_busy.get_untracked().is_some() {
            return;
        }
        let client = app_state.0.api_client.get_untracked();
        pdf_busy.set(Some(id));
        spawn_local(async move {
            let result = match client.report_pdf(id).await {
                Ok(bytes) => download_bytes(&bytes, &report_pdf_file_name(&number, id), "application/pdf"),
                Err(e) => Err(app_state.0.handle_error(&e)),
            };
            if let Err(e) = result {
                let _ = error.try_set(Some(e));
            }
            let _ = pdf_busy.try_set(None);
        });
    };

    let on_confirm_delete = Callback::new(move |_| {
        let Some((id, _)) = delete_target.get_untracked() else {
            return;
        };
        let client = app_state.0.api_client.get_untracked();
        delete_busy.set(true);
        spawn_local(async move {
            match client.delete_report(id).await {
                Ok(()) => {
                    let _ = reports.try_update(|list| list.retain(|r| r.id != id));
                    let _ = delete_target.try_set(None);
                }
                Err(e) => {
                    let _ = error.try_set(Some(app_state.0.handle_error(&e)));
                }
            }
            let _ = delete_open.try_set(false);
            let _ = delete_busy.try_set(false);
        });
    });

    let on_template_chosen = move |ev: web_sys::Event| {
        let value = event_target_value(&ev);
        if let Some(id) = parse_id::<TemplateId>(Some(value)) {
            navigate.with_value(|nav| nav(&format!("/reports/new/{id}"), Default::default()));
        }
    };

    let can_edit = move || app_state.0.can_edit();

    view! {
        <div class="space-y-4">
            <div class="flex items-center justify-between gap-2">
                <div class="space-y-1">
                    <h1 class="text-xl font-semibold">"Reports"</h1>
                    <p class="text-xs text-muted-foreground">"Client deliverables assembled from blocks."</p>
                </div>
                <Show when=can_edit fallback=|| ().into_view()>
                    <div class="flex items-center gap-2">
                        <select
                            class="h-8 rounded-md border border-input bg-background px-2 text-sm"
                            on:change=on_template_chosen
                        >
                            <option value="" selected=true>"From template..."</option>
                            {move || {
                                templates
                                    .get()
                                    .into_iter()
                                    .map(|t| view! { <option value=t.id.to_string()>{t.name}</option> })
                                    .collect_view()
                            }}
                        </select>
                        <a class=LINK_PRIMARY_SM href="/reports/new">
                            <Plus />
                            "New report"
                        </a>
                    </div>
                </Show>
            </div>

            <DismissibleAlert message=error />

            <Show
                when=move || !reports.get().is_empty()
                fallback=move || view! {
                    <div class="rounded-md border border-dashed border-border px-4 py-8 text-center text-xs text-muted-foreground">
                        {move || if loading.get() { "Loading reports..." } else { "No reports yet." }}
                    </div>
                }
            >
                <div class="divide-y divide-border rounded-md border border-border">
                    <For
                        each=move || reports.get()
                        key=|r| (r.id, r.updated_at.clone())
                        children=move |r: Report| {
                            let id = r.id;
                            let number = r.number().to_string();
                            let title = r.title.clone();
                            let number_for_pdf = number.clone();
                            view! {
                                <div class="flex items-center gap-3 px-3 py-2">
                                    <span class="w-20 shrink-0 font-mono text-xs text-muted-foreground">{number}</span>
                                    <div class="min-w-0 flex-1">
                                        <div class="truncate text-sm font-medium">{r.title.clone()}</div>
                                        <div class="truncate text-xs text-muted-foreground">
                                            {format!("{} · {} · {}", r.client_name, r.status, short_date(&r.updated_at))}
                                        </div>
                                    </div>
                                    <Show when=can_edit fallback=|| ().into_view()>
                                        <a class=LINK_ICON title="Edit" href=format!("/reports/{id}/edit")>
                                            <Pencil />
                                        </a>
                                    </Show>
                                    <Button
                                        variant=ButtonVariant::Ghost
                                        size=ButtonSize::Icon
                                        attr:title="Download PDF"
                                        attr:disabled=move || pdf_busy.get().is_some()
                                        on:click=move |_| on_pdf(id, number_for_pdf.clone())
                                    >
                                        <Show when=move || pdf_busy.get() == Some(id) fallback=|| view! { <FileDown /> }>
                                            <Spinner />
                                        </Show>
                                    </Button>
                                    <Show when=can_edit fallback=|| ().into_view()>
                                        <Button
                                            variant=ButtonVariant::Ghost
                                            size=ButtonSize::Icon
                                            class="text-destructive"
                                            attr:title="Delete"
                                            on:click={
                                                let title = title.clone();
                                                move |_| {
                                                    delete_target.set(Some((id, title.clone())));
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
                title="Delete report"
                message=Signal::derive(move || {
                    delete_target
                        .get()
                        .map(|(_, title)| format!("Delete \"{title}\"? This cannot be undone."))
                        .unwrap_or_default()
                })
                busy=delete_busy
                on_confirm=on_confirm_delete
            />
        </div>
    }
}

#[component]
pub fn ReportEditorPage() -> impl IntoView {
    let app_state = expect_context::<AppContext>();
    let params = use_params::<ReportRouteParams>();
    let navigate = StoredValue::new(use_navigate());

    let report_id: RwSignal<Option<ReportId>> = RwSignal::new(None);
    let template_id: RwSignal<Option<TemplateId>> = RwSignal::new(None);
    let number: RwSignal<String> = RwSignal::new(String::new());
    let title: RwSignal<String> = RwSignal::new(String::new());
    let client_name: RwSignal<String> = RwSignal::new(String::new());
    let editor: RwSignal<BlockListEditor> = RwSignal::new(BlockListEditor::new());

    let load_state: RwSignal<LoadState> = RwSignal::new(LoadState::Loading);
    let saving: RwSignal<bool> = RwSignal::new(false);
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let notice: RwSignal<Option<String>> = RwSignal::new(None);
    let save_guard = StoredValue::new_local(InFlight::new());

    let apply = move |d: ReportDraft| {
        let _ = report_id.try_set(d.id);
        let _ = template_id.try_set(d.meta.template_id);
        let _ = number.try_set(d.meta.report_number);
        let _ = title.try_set(d.meta.title);
        let _ = client_name.try_set(d.meta.client_name);
        let _ = editor.try_set(d.editor);
    };

    Effect::new(move |_| {
        let source = params
            .get()
            .map(|p| ReportSource::from_params(&p))
            .unwrap_or(ReportSource::Blank);
        let client = app_state.0.api_client.get_untracked();
        load_state.set(LoadState::Loading);
        error.set(None);
        spawn_local(async move {
            let loaded = match source {
                ReportSource::Blank => Ok(ReportDraft::load_blank(&client).await),
                ReportSource::Template(t) => ReportDraft::load_from_template(&client, t).await,
                ReportSource::Existing(id) => ReportDraft::load_existing(&client, id).await,
            };
            let state = LoadState::from_result(&loaded);
            match loaded {
                Ok(d) => apply(d),
                Err(e) => {
                    let _ = error.try_set(Some(draft_error_message(&app_state.0, &e)));
                }
            }
            let _ = load_state.try_set(state);
        });
    });

    let on_save = move |_| {
        if !load_state.get_untracked().is_editable() || save_guard.with_value(InFlight::is_busy) {
            return;
        }
        let draft = ReportDraft {
            id: report_id.get_untracked(),
            meta: ReportMeta {
                report_number: number.get_untracked(),
                title: title.get_untracked(),
                client_name: client_name.get_untracked(),
                template_id: template_id.get_untracked(),
            },
            editor: editor.get_untracked(),
        };
        let (ticket, request) = match save_guard.with_value(|g| draft.begin_save(g)) {
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
                Ok(SaveOutcome::Created(_)) => {
                    let _ = navigate.try_with_value(|nav| nav("/reports", Default::default()));
                }
                Ok(SaveOutcome::Updated(_)) => {
                    let _ = notice.try_set(Some("Report saved".to_string()));
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
                    <a href="/reports" class="text-xs text-muted-foreground hover:underline">"← Reports"</a>
                    <h1 class="text-xl font-semibold">
                        {move || if report_id.get().is_some() { "Edit report" } else { "New report" }}
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
                                "Loading report..."
                            </div>
                        }
                        .into_any()
                    } else {
                        view! {
                            <div class="rounded-md border border-dashed border-border px-4 py-8 text-center text-xs text-muted-foreground">
                                "This report could not be opened. "
                                <a href="/reports" class="underline">"Back to reports"</a>
                            </div>
                        }
                        .into_any()
                    }
                }
            >
                <div class="grid gap-3 sm:grid-cols-[10rem_1fr_1fr]">
                    <div class="flex flex-col gap-1.5">
                        <Label html_for="report-number" class="text-xs">"Number"</Label>
                        <Input id="report-number" bind_value=number placeholder="Assigned on save" class="h-8 font-mono text-sm" />
                    </div>
                    <div class="flex flex-col gap-1.5">
                        <Label html_for="report-title" class="text-xs">"Title"</Label>
                        <Input id="report-title" bind_value=title required=true class="h-8 text-sm" />
                    </div>
                    <div class="flex flex-col gap-1.5">
                        <Label html_for="report-client" class="text-xs">"Client"</Label>
                        <Input id="report-client" bind_value=client_name required=true class="h-8 text-sm" />
                    </div>
                </div>

                <BlockListView editor=editor heading="Report blocks" />
            </Show>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(id: Option<&str>, template_id: Option<&str>) -> ReportRouteParams {
        ReportRouteParams {
            id: id.map(str::to_string),
            template_id: template_id.map(str::to_string),
        }
    }

    #[test]
    fn test_report_source_from_route() {
        assert_eq!(ReportSource::from_params(&params(None, None)), ReportSource::Blank);
        assert_eq!(
            ReportSource::from_params(&params(None, Some("4"))),
            ReportSource::Template(TemplateId(4))
        );
        assert_eq!(
            ReportSource::from_params(&params(Some("9"), None)),
            ReportSource::Existing(ReportId(9))
        );
        assert_eq!(ReportSource::from_params(&params(None, Some("x"))), ReportSource::Blank);
    }
}
