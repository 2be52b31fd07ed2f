mod frame;
mod registers;
