use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};

/// 终端交互。表单、确认框和提示都经由这里，便于在测试中替换
pub trait Prompt {
    /// 输出一段文本，例如列表表格
    fn show(&mut self, text: &str);

    /// 阻塞式提示，用户确认后返回
    fn alert(&mut self, message: &str) -> Result<()>;

    /// 返回选中项下标；用户取消时为 None
    fn select(&mut self, title: &str, items: &[String]) -> Result<Option<usize>>;

    fn input(&mut self, label: &str, initial: &str) -> Result<String>;

    fn confirm(&mut self, message: &str) -> Result<bool>;
}

#[derive(Default)]
pub struct TerminalPrompt {
    theme: ColorfulTheme,
}

impl Prompt for TerminalPrompt {
    fn show(&mut self, text: &str) {
        println!("{text}");
    }

    fn alert(&mut self, message: &str) -> Result<()> {
        println!("{message}");
        Input::<String>::with_theme(&self.theme)
            .with_prompt("Press Enter to continue")
            .allow_empty(true)
            .interact_text()?;
        Ok(())
    }

    fn select(&mut self, title: &str, items: &[String]) -> Result<Option<usize>> {
        let selection = Select::with_theme(&self.theme)
            .with_prompt(title)
            .items(items)
            .default(0)
            .interact_opt()?;
        Ok(selection)
    }

    fn input(&mut self, label: &str, initial: &str) -> Result<String> {
        let value = Input::<String>::with_theme(&self.theme)
            .with_prompt(label)
            .with_initial_text(initial)
            .allow_empty(true)
            .interact_text()?;
        Ok(value)
    }

    fn confirm(&mut self, message: &str) -> Result<bool> {
        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(false)
            .interact()?;
        Ok(confirmed)
    }
}
