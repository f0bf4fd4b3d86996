use crate::pages::{
    FavoritesPage, LoginPage, NotFoundPage, ReportEditorPage, ReportsPage, RequireEditor,
    RootAuthed, RootPage, TemplateEditorPage, TemplatesPage,
};
use crate::state::{AppContext, AppState};
use leptos::prelude::*;
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

#[component]
pub fn App() -> impl IntoView {
    provide_context(AppContext(AppState::new()));

    view! {
        <Router>
            <Routes fallback=|| view! { <NotFoundPage /> }>
                <Route path=path!("login") view=LoginPage />
                <Route path=path!("reports") view=move || view! {
                    <RootAuthed>
                        <ReportsPage />
                    </RootAuthed>
                } />
                <Route path=path!("reports/new") view=move || view! {
                    <RootAuthed>
                        <RequireEditor>
                            <ReportEditorPage />
                        </RequireEditor>
                    </RootAuthed>
                } />
                <Route path=path!("reports/new/:template_id") view=move || view! {
                    <RootAuthed>
                        <RequireEditor>
                            <ReportEditorPage />
                        </RequireEditor>
                    </RootAuthed>
                } />
                <Route path=path!("reports/:id/edit") view=move || view! {
                    <RootAuthed>
                        <RequireEditor>
                            <ReportEditorPage />
                        </RequireEditor>
                    </RootAuthed>
                } />
                <Route path=path!("templates") view=move || view! {
                    <RootAuthed>
                        <TemplatesPage />
                    </RootAuthed>
                } />
                <Route path=path!("templates/new") view=move || view! {
                    <RootAuthed>
                        <RequireEditor>
                            <TemplateEditorPage />
                        </RequireEditor>
                    </RootAuthed>
                } />
                <Route path=path!("templates/:id/edit") view=move || view! {
                    <RootAuthed>
                        <RequireEditor>
                            <TemplateEditorPage />
                        </RequireEditor>
                    </RootAuthed>
                } />
                <Route path=path!("favorites") view=move || view! {
                    <RootAuthed>
                        <FavoritesPage />
                    </RootAuthed>
                } />
                <Route path=path!("") view=RootPage />
            </Routes>
        </Router>
    }
}
