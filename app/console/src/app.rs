use anyhow::Result;
use shared::proto::MSG_DATE_FORMAT;
use tracing::info;

use crate::api::RecordApi;
use crate::prompt::Prompt;
use crate::store::{ContactStore, Field, FormKind, SubmitOutcome};
use crate::view::View;

pub const DELETE_CONFIRM: &str = "Are you sure you want to delete this entry?";
const RETRY_CONFIRM: &str = "Saving failed. Try again?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Refresh,
    Add,
    Edit,
    Delete,
    Quit,
}

impl Action {
    const ALL: [Action; 5] = [
        Action::Refresh,
        Action::Add,
        Action::Edit,
        Action::Delete,
        Action::Quit,
    ];

    fn label(&self) -> &'static str {
        match self {
            Action::Refresh => "Refresh",
            Action::Add => "Add",
            Action::Edit => "Edit",
            Action::Delete => "Delete",
            Action::Quit => "Quit",
        }
    }
}

/// 交互主循环：渲染列表，读取操作，把表单与确认转交给 store
pub struct ConsoleApp<A: RecordApi, P: Prompt> {
    store: ContactStore<A>,
    prompt: P,
}

impl<A: RecordApi, P: Prompt> ConsoleApp<A, P> {
    pub fn new(store: ContactStore<A>, prompt: P) -> Self {
        Self { store, prompt }
    }

    pub fn store(&self) -> &ContactStore<A> {
        &self.store
    }

    pub async fn run(&mut self) -> Result<()> {
        self.refresh().await?;
        loop {
            self.render();
            let items: Vec<String> = Action::ALL.iter().map(|a| a.label().to_string()).collect();
            let action = match self.prompt.select("Choose an action", &items)? {
                Some(index) => Action::ALL[index],
                None => Action::Quit,
            };
            if !self.step(action).await? {
                break;
            }
        }
        info!("Console closed");
        Ok(())
    }

    /// 执行一个操作；返回 false 表示退出
    pub async fn step(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::Refresh => self.refresh().await?,
            Action::Add => {
                self.store.open_add();
                self.fill_and_submit(FormKind::Add).await?;
            }
            Action::Edit => {
                if let Some(id) = self.pick_record("Select the entry to edit")? {
                    if self.store.open_edit(id) {
                        self.fill_and_submit(FormKind::Edit).await?;
                    }
                }
            }
            Action::Delete => {
                if let Some(id) = self.pick_record("Select the entry to delete")? {
                    let confirmed = self.prompt.confirm(DELETE_CONFIRM)?;
                    self.store.delete(id, confirmed).await;
                    self.flush_alert()?;
                }
            }
            Action::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn render(&mut self) {
        let table = View::records(self.store.records()).to_string();
        self.prompt.show(&table);
    }

    async fn refresh(&mut self) -> Result<()> {
        if let Err(e) = self.store.refresh().await {
            self.prompt.alert(&e.to_string())?;
        }
        Ok(())
    }

    fn pick_record(&mut self, title: &str) -> Result<Option<u64>> {
        if self.store.records().is_empty() {
            self.prompt.alert("No data")?;
            return Ok(None);
        }
        let items: Vec<String> = self.store.records().iter().map(View::record_label).collect();
        let choice = self.prompt.select(title, &items)?;
        Ok(choice.and_then(|index| self.store.records().get(index).map(|r| r.id)))
    }

    /// 表单打开期间逐项询问；日期留空表示放弃
    async fn fill_and_submit(&mut self, form: FormKind) -> Result<()> {
        while self.store.is_open(form) {
            for field in Field::ALL {
                if field == Field::DateOfBirth {
                    if !self.ask_date(form)? {
                        self.store.close(form);
                        return Ok(());
                    }
                    continue;
                }
                let current = self.store.buffer(form).get(field).to_string();
                let value = self.prompt.input(field.label(), &current)?;
                self.store.set_field(form, field, value.trim());
            }

            match self.store.submit(form).await {
                SubmitOutcome::Saved(_) => self.flush_alert()?,
                SubmitOutcome::InvalidDate => self.prompt.alert(MSG_DATE_FORMAT)?,
                SubmitOutcome::Failed(_) => {
                    self.flush_alert()?;
                    if !self.prompt.confirm(RETRY_CONFIRM)? {
                        self.store.close(form);
                    }
                }
                SubmitOutcome::NotOpen => break,
            }
        }
        Ok(())
    }

    /// 反复询问直到日期合法；返回 false 表示用户留空放弃
    fn ask_date(&mut self, form: FormKind) -> Result<bool> {
        loop {
            let current = self.store.buffer(form).date_of_birth.clone();
            let value = self.prompt.input(Field::DateOfBirth.label(), &current)?;
            let value = value.trim();
            if value.is_empty() {
                return Ok(false);
            }
            self.store.set_field(form, Field::DateOfBirth, value);
            if !self.store.buffer(form).date_error {
                return Ok(true);
            }
            self.prompt.alert(MSG_DATE_FORMAT)?;
        }
    }

    fn flush_alert(&mut self) -> Result<()> {
        if let Some(message) = self.store.take_alert() {
            self.prompt.alert(&message)?;
        }
        Ok(())
    }
}
