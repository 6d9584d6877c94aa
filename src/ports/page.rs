pub trait PageNavigator: Clone + Send + Sync + 'static {
    fn current_url(&self) -> String;
    fn navigate(&self, url: &str);
}
