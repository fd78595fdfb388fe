use std::sync::Arc;

use core_types::{AccessToken, NewProject, Project, ProjectBackend};
use tracing::error;

use crate::error::{WorkspaceError, WorkspaceResult};
use crate::format::format_numeric_date;
use crate::notify::{Notification, NotificationCenter};

/// The signed-in user's project list.
pub struct ProjectDirectory {
    backend: Arc<dyn ProjectBackend>,
    notifications: Arc<NotificationCenter>,
    token: AccessToken,
    projects: Vec<Project>,
    filter: String,
}

impl ProjectDirectory {
    pub fn new(
        backend: Arc<dyn ProjectBackend>,
        notifications: Arc<NotificationCenter>,
        token: AccessToken,
    ) -> Self {
        Self {
            backend,
            notifications,
            token,
            projects: Vec::new(),
            filter: String::new(),
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub async fn refresh(&mut self) -> WorkspaceResult<()> {
        match self.backend.list_projects(&self.token).await {
            Ok(projects) => {
                self.projects = projects;
                Ok(())
            }
            Err(err) => {
                error!(%err, "failed to fetch projects");
                self.notifications.push(Notification::error(err.to_string()));
                Err(err.into())
            }
        }
    }

    pub async fn create(&mut self, name: &str, description: &str) -> WorkspaceResult<&Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkspaceError::InvalidInput("Please enter a project name"));
        }
        let request = NewProject {
            name: name.to_string(),
            description: description.trim().to_string(),
        };
        match self.backend.create_project(&self.token, &request).await {
            Ok(project) => {
                self.notifications.push(
                    Notification::success("Project created successfully")
                        .with_description(format!("\"{name}\" has been created.")),
                );
                self.projects.push(project);
                Ok(&self.projects[self.projects.len() - 1])
            }
            Err(err) => {
                error!(%err, name, "failed to create project");
                self.notifications.push(Notification::error(err.to_string()));
                Err(err.into())
            }
        }
    }

    pub async fn delete(&mut self, project_id: &str) -> WorkspaceResult<()> {
        match self.backend.delete_project(&self.token, project_id).await {
            Ok(()) => {
                let name = self
                    .projects
                    .iter()
                    .find(|project| project.id == project_id)
                    .map(|project| project.name.clone())
                    .unwrap_or_default();
                self.projects.retain(|project| project.id != project_id);
                self.notifications.push(
                    Notification::success("Project deleted successfully")
                        .with_description(format!("\"{name}\" has been deleted.")),
                );
                Ok(())
            }
            Err(err) => {
                error!(%err, project_id, "failed to delete project");
                self.notifications.push(Notification::error(err.to_string()));
                Err(err.into())
            }
        }
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    /// Projects whose name contains the filter, ignoring case.
    pub fn visible(&self) -> Vec<&Project> {
        let needle = self.filter.trim().to_lowercase();
        self.projects
            .iter()
            .filter(|project| needle.is_empty() || project.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn created_label(project: &Project) -> String {
        format_numeric_date(project.created_at.as_deref())
    }
}
