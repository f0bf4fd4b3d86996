use super::{delete_all, is_image_mime, upload_all, ImageFile};
use crate::components::ui::{Button, ButtonSize, ButtonVariant, ConfirmDialog, DismissibleAlert, Spinner};
use crate::models::TemplateId;
use crate::state::AppContext;
use crate::util::browser::{copy_text, read_image, take_selected_files};
use crate::util::file_name_from_url;
use icons::{ClipboardCopy, ImageUp, Trash2};
use leptos::prelude::*;
use leptos::task::spawn_local;

/// Images stored with a template, referenced from block content by URL.
#[component]
pub fn ImageGallery(template_id: TemplateId) -> impl IntoView {
    let app_state = expect_context::<AppContext>();

    let images: RwSignal<Vec<String>> = RwSignal::new(vec![]);
    let selected: RwSignal<Vec<String>> = RwSignal::new(vec![]);
    let busy: RwSignal<bool> = RwSignal::new(false);
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let notice: RwSignal<Option<String>> = RwSignal::new(None);
    let delete_open: RwSignal<bool> = RwSignal::new(false);

    let load = move || {
        let client = app_state.0.api_client.get_untracked();
        spawn_local(async move {
            match client.list_images(template_id).await {
                Ok(urls) => {
                    let _ = selected.try_update(|s| {
                        s.retain(|name| urls.iter().any(|u| file_name_from_url(u) == name))
                    });
                    let _ = images.try_set(urls);
                }
                Err(e) => {
                    let _ = error.try_set(Some(app_state.0.handle_error(&e)));
                }
            }
        });
    };

    Effect::new(move |_| load());

    let on_files = move |ev: web_sys::Event| {
        let picked = take_selected_files(&ev);
        if picked.is_empty() || busy.get_untracked() {
            return;
        }
        let client = app_state.0.api_client.get_untracked();
        busy.set(true);
        error.set(None);
        spawn_local(async move {
            let mut files: Vec<ImageFile> = Vec::with_capacity(picked.len());
            let mut skipped = 0;
            for f in &picked {
                match read_image(f).await {
                    Ok(img) if is_image_mime(&img.mime) => files.push(img),
                    Ok(img) => {
                        log::warn!("skipping {} ({})", img.name, img.mime);
                        skipped += 1;
                    }
                    Err(e) => {
                        log::warn!("could not read {}: {e}", f.name());
                        skipped += 1;
                    }
                }
            }

            let outcome = upload_all(&client, template_id, &files).await;
            let mut summary = outcome.summary("Uploaded");
            if skipped > 0 {
                summary.push_str(&format!("; skipped {skipped} non-image file(s)"));
            }
            if outcome.is_complete() {
                let _ = notice.try_set(Some(summary));
            } else {
                if let Some((_, e)) = &outcome.failure {
                    let _ = app_state.0.handle_error(e);
                }
                let _ = error.try_set(Some(summary));
            }
            let _ = busy.try_set(false);
            load();
        });
    };

    let on_confirm_delete = Callback::new(move |_| {
        let names = selected.get_untracked();
        if names.is_empty() || busy.get_untracked() {
            return;
        }
        let client = app_state.0.api_client.get_untracked();
        busy.set(true);
        spawn_local(async move {
            let outcome = delete_all(&client, template_id, &names).await;
            match &outcome.failure {
                None => {
                    let _ = notice.try_set(Some(outcome.summary("Deleted")));
                }
                Some((_, e)) => {
                    let _ = app_state.0.handle_error(e);
                    let _ = error.try_set(Some(outcome.summary("Deleted")));
                }
            }
            let _ = delete_open.try_set(false);
            let _ = busy.try_set(false);
            load();
        });
    });

    let on_copy = move |url: String| {
        let absolute = app_state.0.absolute_url(&url);
        spawn_local(async move {
            match copy_text(&absolute).await {
                Ok(()) => {
                    let _ = notice.try_set(Some(format!("Copied {absolute}")));
                }
                Err(e) => {
                    let _ = error.try_set(Some(format!("Could not copy the link: {e}")));
                }
            }
        });
    };

    let toggle = move |name: String| {
        selected.update(|s| {
            if let Some(pos) = s.iter().position(|n| *n == name) {
                s.remove(pos);
            } else {
                s.push(name);
            }
        });
    };

    view! {
        <div class="space-y-3 rounded-md border border-border p-3">
            <div class="flex items-center justify-between gap-2">
                <div class="text-sm font-medium">"Images"</div>
                <div class="flex items-center gap-2">
                    <Show when=move || !selected.get().is_empty() fallback=|| ().into_view()>
                        <Button
                            variant=ButtonVariant::Destructive
                            size=ButtonSize::Sm
                            attr:disabled=move || busy.get()
                            on:click=move |_| delete_open.set(true)
                        >
                            <Trash2 />
                            {move || format!("Delete {}", selected.get().len())}
                        </Button>
                    </Show>
                    <label class="inline-flex h-8 cursor-pointer items-center gap-1.5 rounded-md border px-3 text-sm hover:bg-accent">
                        <Show when=move || busy.get() fallback=|| view! { <ImageUp /> }>
                            <Spinner />
                        </Show>
                        "Upload"
                        <input type="file" accept="image/*" multiple=true class="hidden" on:change=on_files />
                    </label>
                </div>
            </div>

            <DismissibleAlert message=error />
            <DismissibleAlert message=notice success=true />

            <Show
                when=move || !images.get().is_empty()
                fallback=|| view! { <div class="text-xs text-muted-foreground">"No images uploaded for this template."</div> }
            >
                <div class="grid grid-cols-2 gap-2 sm:grid-cols-4">
                    <For
                        each=move || images.get()
                        key=|url| url.clone()
                        children=move |url: String| {
                            let name = file_name_from_url(&url).to_string();
                            let src = app_state.0.absolute_url(&url);
                            let checked_name = name.clone();
                            let toggle_name = name.clone();
                            view! {
                                <div class="space-y-1 rounded-md border border-border p-1.5">
                                    <img src=src alt=name.clone() class="h-24 w-full rounded object-cover" />
                                    <div class="flex items-center gap-1">
                                        <input
                                            type="checkbox"
                                            prop:checked=move || selected.get().contains(&checked_name)
                                            on:change=move |_| toggle(toggle_name.clone())
                                        />
                                        <span class="min-w-0 flex-1 truncate text-[11px]" title=name.clone()>{name.clone()}</span>
                                        <Button
                                            variant=ButtonVariant::Ghost
                                            size=ButtonSize::Icon
                                            class="size-6"
                                            attr:title="Copy link"
                                            on:click=move |_| on_copy(url.clone())
                                        >
                                            <ClipboardCopy />
                                        </Button>
                                    </div>
                                </div>
                            }
                        }
                    />
                </div>
            </Show>

            <ConfirmDialog
                open=delete_open
                title="Delete images"
                message=Signal::derive(move || {
                    format!("Delete {} image(s)? Blocks that link to them will show broken images.", selected.get().len())
                })
                busy=busy
                on_confirm=on_confirm_delete
            />
        </div>
    }
}
