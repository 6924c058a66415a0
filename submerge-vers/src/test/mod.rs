mod head;
mod room;
