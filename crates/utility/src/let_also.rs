/// Kotlin style scope functions, handy at the end of long builder or query chains.
pub trait LetAlso: Sized {
    /// Passes the value by value into `f` and returns its result.
    fn let_owned<R, F: FnOnce(Self) -> R>(self, f: F) -> R {
        f(self)
    }

    /// Passes a reference into `f` and returns its result.
    fn let_ref<R, F: FnOnce(&Self) -> R>(&self, f: F) -> R {
        f(self)
    }

    /// Lets `f` mutate the value, then hands it back.
    fn also<F: FnOnce(&mut Self)>(mut self, f: F) -> Self {
        f(&mut self);
        self
    }
}

impl<T> LetAlso for T {}
